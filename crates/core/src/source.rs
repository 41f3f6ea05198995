//! 로그 소스 trait -- 외부 collaborator 확장 포인트 정의
//!
//! 실제 이벤트 조회는 프로세스 경계 너머에서 수행됩니다
//! (`logward-winlog`의 PowerShell 소스 등). 이 trait은 그 경계의
//! 인터페이스만 정의하며, 코어는 구현 세부를 알지 못합니다.

use std::time::Duration;

use crate::error::SourceError;
use crate::types::{Channel, ChannelInfo, EventRecord, FilterExpression, QueryWindow};

/// 이벤트 로그 소스 collaborator
///
/// 호출자가 타임아웃을 명시하며, 타임아웃 초과 시 구현체는
/// [`SourceError::Timeout`]을 반환해야 합니다. 재시도 정책은
/// 이 trait의 범위가 아닙니다.
pub trait EventSource: Send + Sync {
    /// 검증 완료된 쿼리를 실행하여 이벤트 레코드를 반환합니다.
    ///
    /// `filter`는 이미 `FilterValidator`를 통과한 표현식이므로
    /// 구현체는 내용을 재검증하지 않고 그대로 전달합니다.
    fn query_events(
        &self,
        channel: Channel,
        filter: Option<&FilterExpression>,
        window: &QueryWindow,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<EventRecord>, SourceError>> + Send;

    /// 채널 메타데이터를 조회합니다.
    ///
    /// 접근 불가능한 채널은 에러 대신
    /// [`ChannelInfo::unavailable`] placeholder로 보고할 수 있습니다.
    fn channel_info(
        &self,
        channel: Channel,
        timeout: Duration,
    ) -> impl Future<Output = Result<ChannelInfo, SourceError>> + Send;

    /// 이 소스가 제공하는 채널 목록을 반환합니다.
    ///
    /// allowlist에 고정되어 있으며, 접근 불가능한 채널도 생략하지 않습니다.
    fn channels(&self) -> Vec<Channel>;
}
