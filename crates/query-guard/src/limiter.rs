//! 쿼리 파라미터 clamp 및 타임스탬프 검증
//!
//! [`QueryLimiter`]는 숫자/시간 파라미터를 설정된 한도 안으로 clamp하고
//! 타임스탬프 문법을 검증합니다. "현재 시각"은 항상 호출자가 명시적으로
//! 전달합니다 -- 이 컴포넌트는 ambient clock을 읽지 않으므로
//! 결정적이고 테스트 가능합니다.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use logward_core::config::QueryLimits;

use crate::error::QueryGuardError;

/// 쿼리 파라미터 제한기
pub struct QueryLimiter;

impl QueryLimiter {
    /// 요청된 결과 개수를 `1..=limits.max_results` 범위로 clamp합니다.
    ///
    /// 요청이 없으면 `limits.max_results`가 기본값입니다.
    pub fn clamp_results(requested: Option<u32>, limits: &QueryLimits) -> u32 {
        requested
            .unwrap_or(limits.max_results)
            .min(limits.max_results)
            .max(1)
    }

    /// 요청된 lookback 시간을 `1..=limits.max_lookback_hours` 범위로 clamp합니다.
    pub fn clamp_lookback_hours(requested: Option<u32>, limits: &QueryLimits) -> u32 {
        requested
            .unwrap_or(limits.max_lookback_hours)
            .min(limits.max_lookback_hours)
            .max(1)
    }

    /// start/end 타임스탬프를 파싱합니다.
    ///
    /// 인식 형식: RFC 3339 (`2024-03-15T09:30:00Z`, 오프셋 포함), 또는
    /// 타임존 없는 ISO-8601 (`2024-03-15T09:30:00`, UTC로 해석).
    /// end >= start 순서는 검증하지 않습니다 -- 로그 소스에 위임합니다.
    pub fn resolve_window(
        start: Option<&str>,
        end: Option<&str>,
        _limits: &QueryLimits,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), QueryGuardError> {
        let start = start.map(parse_timestamp).transpose()?;
        let end = end.map(parse_timestamp).transpose()?;
        Ok((start, end))
    }

    /// lookback 시간에서 윈도우 시작 시각을 계산합니다.
    ///
    /// `now`는 호출자가 전달합니다.
    pub fn lookback_start(hours: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::hours(i64::from(hours))
    }
}

/// 단일 타임스탬프를 엄격하게 파싱합니다.
fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, QueryGuardError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(QueryGuardError::InvalidTimestamp {
        input: input.to_owned(),
    })
}
