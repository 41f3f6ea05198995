//! 채널 allowlist 검증
//!
//! [`ChannelGuard`]는 요청된 채널 이름을 고정 allowlist와 바이트 단위로
//! 비교합니다. 정규화의 부재가 곧 보안 속성입니다 -- trim, 대소문자 변환,
//! 유니코드 정규화, 경로 해석을 일절 수행하지 않으므로, 입력이 허용 이름과
//! 한 바이트라도 다르면 (공백, 대소문자, null 바이트, 전각 homoglyph,
//! `../` 접두사 등) 교정 없이 거부됩니다.

use logward_core::types::{ALLOWED_CHANNELS, Channel};

use crate::error::QueryGuardError;

/// 채널 allowlist 검증기
pub struct ChannelGuard;

impl ChannelGuard {
    /// 입력을 allowlist와 비교하여 [`Channel`]을 반환합니다.
    ///
    /// 허용 이름과 정확히 일치하지 않는 모든 입력은
    /// [`QueryGuardError::ChannelRejected`]로 거부됩니다. 에러에 담긴
    /// allowlist는 진단 용도이며 자동 교정에 사용해서는 안 됩니다.
    pub fn validate(input: &str) -> Result<Channel, QueryGuardError> {
        for channel in ALLOWED_CHANNELS {
            if input == channel.as_str() {
                return Ok(channel);
            }
        }
        Err(QueryGuardError::ChannelRejected {
            requested: input.to_owned(),
            allowed: ALLOWED_CHANNELS.iter().map(|c| c.as_str()).collect(),
        })
    }

    /// 예외 처리 없이 분기하고 싶은 호출부를 위한 비실패 변형입니다.
    pub fn is_allowed(input: &str) -> bool {
        ALLOWED_CHANNELS.iter().any(|c| input == c.as_str())
    }

    /// 허용 채널 목록을 선언 순서대로 반환합니다.
    ///
    /// 호출자가 allowlist를 변경할 수 없도록 소유된 복사본을 반환합니다.
    pub fn allowed_channels() -> Vec<Channel> {
        ALLOWED_CHANNELS.to_vec()
    }
}
