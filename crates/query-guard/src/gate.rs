//! 쿼리 게이트 -- 검증기 조합 및 인시던트 스캔 오케스트레이션
//!
//! [`QueryGate`]는 채널/필터/한도 검증기를 조합하여 두 가지 연산을
//! 호출자에게 노출합니다:
//!
//! 1. `prepare` + `execute`: 쿼리를 검증하고 로그 소스에 전달
//! 2. `scan_for_incidents`: 채널별 준비된 쿼리를 발행하고
//!    결과를 분류/정렬하여 집계
//!
//! 검증은 fail-fast이며 부분 부수효과가 없습니다. 스캔에서 채널 하나의
//! 실패는 해당 채널의 신호 0개로 처리될 뿐, 스캔 전체를 중단하지 않습니다.

use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use logward_core::config::QueryLimits;
use logward_core::metrics as metric_names;
use logward_core::source::EventSource;
use logward_core::types::{
    Channel, EventRecord, FilterExpression, IncidentSignal, QueryWindow,
};

use crate::channel::ChannelGuard;
use crate::error::QueryGuardError;
use crate::filter::FilterValidator;
use crate::incident::{self, IncidentPattern, PATTERN_TABLE};
use crate::limiter::QueryLimiter;

/// 인시던트 스캔의 채널당 조회 상한
///
/// 호출자 대면 결과 한도와는 별개의 고정값입니다.
pub const SCAN_BATCH_CAP: u32 = 500;

/// 검증 전의 원시 쿼리 요청
///
/// 프로토콜 레이어가 역직렬화하여 그대로 전달하는 형태입니다.
/// 모든 필드는 신뢰할 수 없는 입력으로 취급됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// 요청 채널 이름
    pub channel: String,
    /// XPath 필터 (선택)
    #[serde(default)]
    pub filter: Option<String>,
    /// 윈도우 시작 (ISO-8601, 선택)
    #[serde(default)]
    pub start_time: Option<String>,
    /// 윈도우 끝 (ISO-8601, 선택)
    #[serde(default)]
    pub end_time: Option<String>,
    /// 최대 결과 개수 (선택, clamp 대상)
    #[serde(default)]
    pub max_results: Option<u32>,
}

/// 검증 완료된 쿼리
///
/// 이 타입의 존재 자체가 모든 검증 통과를 의미합니다.
/// 로그 소스는 내용을 재검증하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedQuery {
    /// 검증된 채널
    pub channel: Channel,
    /// 검증된 필터 (없으면 전체 조회)
    pub filter: Option<FilterExpression>,
    /// clamp 완료된 시간 윈도우와 결과 상한
    pub window: QueryWindow,
}

/// 쿼리 게이트
///
/// 한도 설정은 생성 시 한 번 주입되며 이후 불변입니다.
/// 모든 메서드는 `&self`만 요구하므로 스레드 간 공유가 안전합니다.
pub struct QueryGate {
    limits: QueryLimits,
}

impl QueryGate {
    /// 주어진 한도로 게이트를 생성합니다.
    pub fn new(limits: QueryLimits) -> Self {
        Self { limits }
    }

    /// 적용 중인 한도를 반환합니다.
    pub fn limits(&self) -> &QueryLimits {
        &self.limits
    }

    /// 원시 요청을 검증하여 [`PreparedQuery`]로 변환합니다.
    ///
    /// 채널, 필터, 시간 윈도우, 결과 한도가 독립적으로 검증되며
    /// 첫 실패에서 즉시 반환합니다.
    pub fn prepare(&self, request: &QueryRequest) -> Result<PreparedQuery, QueryGuardError> {
        let result = self.prepare_inner(request);
        match &result {
            Ok(prepared) => {
                counter!(metric_names::GATE_QUERIES_ACCEPTED_TOTAL).increment(1);
                debug!(
                    channel = %prepared.channel,
                    max_results = prepared.window.max_results,
                    has_filter = prepared.filter.is_some(),
                    "query accepted"
                );
            }
            Err(err) => {
                counter!(
                    metric_names::GATE_QUERIES_REJECTED_TOTAL,
                    metric_names::LABEL_REASON => err.code()
                )
                .increment(1);
                debug!(code = err.code(), "query rejected");
            }
        }
        result
    }

    fn prepare_inner(&self, request: &QueryRequest) -> Result<PreparedQuery, QueryGuardError> {
        let channel = ChannelGuard::validate(&request.channel)?;
        let filter = FilterValidator::validate(request.filter.as_deref(), &self.limits)?;
        let (start, end) = QueryLimiter::resolve_window(
            request.start_time.as_deref(),
            request.end_time.as_deref(),
            &self.limits,
        )?;
        let max_results = QueryLimiter::clamp_results(request.max_results, &self.limits);

        Ok(PreparedQuery {
            channel,
            filter,
            window: QueryWindow {
                start,
                end,
                max_results,
            },
        })
    }

    /// 준비된 쿼리를 로그 소스에 전달하고 결과를 반환합니다.
    ///
    /// 설정된 타임아웃으로 호출을 제한하며, 초과 시
    /// [`QueryGuardError::Timeout`]으로 실패합니다. 이 코어는
    /// 재시도하지 않습니다 -- 재시도 정책은 호출자 몫입니다.
    pub async fn execute<S: EventSource>(
        &self,
        source: &S,
        prepared: &PreparedQuery,
    ) -> Result<Vec<EventRecord>, QueryGuardError> {
        let timeout = self.limits.timeout();
        let started = Instant::now();

        let outcome = tokio::time::timeout(
            timeout,
            source.query_events(
                prepared.channel,
                prepared.filter.as_ref(),
                &prepared.window,
                timeout,
            ),
        )
        .await;

        histogram!(metric_names::GATE_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(Ok(records)) => {
                counter!(
                    metric_names::SOURCE_QUERIES_TOTAL,
                    metric_names::LABEL_RESULT => "success"
                )
                .increment(1);
                Ok(records)
            }
            Ok(Err(source_err)) => {
                counter!(
                    metric_names::SOURCE_QUERIES_TOTAL,
                    metric_names::LABEL_RESULT => "failure"
                )
                .increment(1);
                Err(QueryGuardError::Source(source_err))
            }
            Err(_elapsed) => {
                counter!(metric_names::GATE_QUERY_TIMEOUTS_TOTAL).increment(1);
                Err(QueryGuardError::Timeout {
                    seconds: timeout.as_secs(),
                })
            }
        }
    }

    /// 여러 채널에서 인시던트 신호를 스캔합니다.
    ///
    /// 채널마다 패턴 테이블의 전체 이벤트 코드와 lookback 하한을 덮는
    /// 결합 필터 하나로 조회한 뒤 (상한 [`SCAN_BATCH_CAP`]), 반환된
    /// 레코드를 분류하여 누적합니다. 채널 하나의 실패는 경고 로그만
    /// 남기고 건너뜁니다. 최종 결과는 시각 내림차순(stable sort)입니다 --
    /// 동일 시각은 채널 순서, 그다음 채널 내 소스 순서를 유지합니다.
    pub async fn scan_for_incidents<S: EventSource>(
        &self,
        source: &S,
        channels: &[Channel],
        hours_back: u32,
        now: DateTime<Utc>,
    ) -> Vec<IncidentSignal> {
        let hours = QueryLimiter::clamp_lookback_hours(Some(hours_back), &self.limits);
        let start = QueryLimiter::lookback_start(hours, now);
        let filter = FilterExpression::from_validated(build_scan_filter(PATTERN_TABLE, hours));
        let timeout = self.limits.timeout();

        let mut signals = Vec::new();
        for &channel in channels {
            let window = QueryWindow {
                start: Some(start),
                end: None,
                max_results: SCAN_BATCH_CAP,
            };

            let records = match tokio::time::timeout(
                timeout,
                source.query_events(channel, Some(&filter), &window, timeout),
            )
            .await
            {
                Ok(Ok(records)) => records,
                Ok(Err(err)) => {
                    counter!(
                        metric_names::SCAN_CHANNEL_FAILURES_TOTAL,
                        metric_names::LABEL_CHANNEL => channel.as_str()
                    )
                    .increment(1);
                    warn!(channel = %channel, error = %err, "channel scan failed, skipping");
                    continue;
                }
                Err(_elapsed) => {
                    counter!(
                        metric_names::SCAN_CHANNEL_FAILURES_TOTAL,
                        metric_names::LABEL_CHANNEL => channel.as_str()
                    )
                    .increment(1);
                    warn!(channel = %channel, "channel scan timed out, skipping");
                    continue;
                }
            };

            for record in &records {
                if let Some(signal) = incident::classify(record, PATTERN_TABLE) {
                    counter!(
                        metric_names::SCAN_SIGNALS_TOTAL,
                        metric_names::LABEL_SEVERITY => signal.severity.to_string().to_lowercase()
                    )
                    .increment(1);
                    signals.push(signal);
                }
            }
        }

        // stable sort: 동일 시각의 상대 순서(채널 순서, 소스 순서)를 보존합니다
        signals.sort_by(|a, b| b.record.time_created.cmp(&a.record.time_created));
        signals
    }
}

/// 패턴 테이블 전체를 덮는 스캔 필터를 생성합니다.
///
/// 생성된 표현식은 FilterValidator의 안전 서브셋 안에 있어야 합니다
/// (테스트로 고정).
fn build_scan_filter(table: &[IncidentPattern], hours: u32) -> String {
    let mut codes: Vec<u32> = Vec::new();
    for pattern in table {
        for &code in pattern.event_codes {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }

    let clauses: Vec<String> = codes.iter().map(|c| format!("EventID={c}")).collect();
    let window_ms = u64::from(hours) * 3_600_000;
    format!(
        "*[System[({}) and TimeCreated[timediff(@SystemTime) <= {}]]]",
        clauses.join(" or "),
        window_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::TimeZone;

    use logward_core::error::SourceError;
    use logward_core::types::{ChannelInfo, EventLevel};

    use crate::filter::FilterValidator;

    /// 테스트용 모의 소스
    struct MockSource {
        records: HashMap<Channel, Vec<EventRecord>>,
        fail: HashSet<Channel>,
        delay: Option<Duration>,
        seen_windows: Mutex<Vec<QueryWindow>>,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                records: HashMap::new(),
                fail: HashSet::new(),
                delay: None,
                seen_windows: Mutex::new(Vec::new()),
            }
        }

        fn with_records(mut self, channel: Channel, records: Vec<EventRecord>) -> Self {
            self.records.insert(channel, records);
            self
        }

        fn failing(mut self, channel: Channel) -> Self {
            self.fail.insert(channel);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    impl EventSource for MockSource {
        async fn query_events(
            &self,
            channel: Channel,
            _filter: Option<&FilterExpression>,
            window: &QueryWindow,
            _timeout: Duration,
        ) -> Result<Vec<EventRecord>, SourceError> {
            self.seen_windows.lock().unwrap().push(window.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.contains(&channel) {
                return Err(SourceError::Unavailable {
                    reason: "mock channel failure".to_owned(),
                });
            }
            let mut records = self.records.get(&channel).cloned().unwrap_or_default();
            records.truncate(window.max_results as usize);
            Ok(records)
        }

        async fn channel_info(
            &self,
            channel: Channel,
            _timeout: Duration,
        ) -> Result<ChannelInfo, SourceError> {
            Ok(ChannelInfo {
                channel,
                enabled: !self.fail.contains(&channel),
                record_count: self
                    .records
                    .get(&channel)
                    .map(|r| r.len() as u64)
                    .unwrap_or(0),
                oldest_record_id: None,
            })
        }

        fn channels(&self) -> Vec<Channel> {
            ChannelGuard::allowed_channels()
        }
    }

    fn record(channel: Channel, id: u64, provider: &str, event_id: u32, hour: u32) -> EventRecord {
        EventRecord {
            record_id: id,
            event_id,
            level: EventLevel::Error,
            time_created: Utc.with_ymd_and_hms(2024, 3, 15, hour, 0, 0).unwrap(),
            provider: provider.to_owned(),
            message: "test".to_owned(),
            computer: "WS-0042".to_owned(),
            channel: channel.as_str().to_owned(),
            task: None,
            opcode: None,
            keywords: None,
            user_sid: None,
        }
    }

    fn gate() -> QueryGate {
        QueryGate::new(QueryLimits::default())
    }

    fn request(channel: &str) -> QueryRequest {
        QueryRequest {
            channel: channel.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn prepare_accepts_minimal_request() {
        let prepared = gate().prepare(&request("Application")).unwrap();
        assert_eq!(prepared.channel, Channel::Application);
        assert!(prepared.filter.is_none());
        assert_eq!(prepared.window.max_results, 1000);
        assert!(prepared.window.start.is_none());
    }

    #[test]
    fn prepare_accepts_full_request() {
        let req = QueryRequest {
            channel: "System".to_owned(),
            filter: Some("*[System[EventID=41]]".to_owned()),
            start_time: Some("2024-03-15T00:00:00Z".to_owned()),
            end_time: Some("2024-03-15T12:00:00Z".to_owned()),
            max_results: Some(50),
        };
        let prepared = gate().prepare(&req).unwrap();
        assert_eq!(prepared.channel, Channel::System);
        assert_eq!(prepared.filter.unwrap().as_str(), "*[System[EventID=41]]");
        assert_eq!(prepared.window.max_results, 50);
        assert!(prepared.window.start.is_some());
        assert!(prepared.window.end.is_some());
    }

    #[test]
    fn prepare_rejects_unknown_channel() {
        let err = gate().prepare(&request("Security")).unwrap_err();
        assert_eq!(err.code(), "CHANNEL_REJECTED");
    }

    #[test]
    fn prepare_rejects_blocked_filter() {
        let req = QueryRequest {
            channel: "Application".to_owned(),
            filter: Some("*[contains(Provider,'x')]".to_owned()),
            ..Default::default()
        };
        let err = gate().prepare(&req).unwrap_err();
        assert_eq!(err.code(), "FILTER_REJECTED");
    }

    #[test]
    fn prepare_rejects_bad_timestamp() {
        let req = QueryRequest {
            channel: "Application".to_owned(),
            start_time: Some("last tuesday".to_owned()),
            ..Default::default()
        };
        let err = gate().prepare(&req).unwrap_err();
        assert_eq!(err.code(), "INVALID_TIMESTAMP");
    }

    #[test]
    fn prepare_clamps_oversized_cap() {
        let req = QueryRequest {
            channel: "Application".to_owned(),
            max_results: Some(5_000_000),
            ..Default::default()
        };
        let prepared = gate().prepare(&req).unwrap();
        assert_eq!(prepared.window.max_results, 1000);
    }

    #[tokio::test]
    async fn execute_returns_source_records() {
        let source = MockSource::new().with_records(
            Channel::Application,
            vec![record(Channel::Application, 1, "Application Error", 1000, 9)],
        );
        let prepared = gate().prepare(&request("Application")).unwrap();
        let records = gate().execute(&source, &prepared).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_id, 1000);
    }

    #[tokio::test]
    async fn execute_passes_through_source_error() {
        let source = MockSource::new().failing(Channel::Application);
        let prepared = gate().prepare(&request("Application")).unwrap();
        let err = gate().execute(&source, &prepared).await.unwrap_err();
        assert_eq!(err.code(), "SOURCE_ERROR");
    }

    #[tokio::test(start_paused = true)]
    async fn execute_times_out_without_retry() {
        let source = MockSource::new()
            .with_records(Channel::Application, vec![])
            .with_delay(Duration::from_secs(120));
        let gate = gate();
        let prepared = gate.prepare(&request("Application")).unwrap();
        let err = gate.execute(&source, &prepared).await.unwrap_err();
        assert_eq!(err.code(), "QUERY_TIMEOUT");
        // 재시도 없음: 소스는 정확히 한 번만 호출됩니다
        assert_eq!(source.seen_windows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scan_aggregates_and_sorts_newest_first() {
        let source = MockSource::new()
            .with_records(
                Channel::Application,
                vec![
                    record(Channel::Application, 1, "Application Error", 1000, 8),
                    record(Channel::Application, 2, "Application Hang", 1002, 11),
                    record(Channel::Application, 3, "Unrelated Provider", 999, 10),
                ],
            )
            .with_records(
                Channel::System,
                vec![record(Channel::System, 4, "Microsoft-Windows-WHEA-Logger", 17, 10)],
            );
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let signals = gate()
            .scan_for_incidents(
                &source,
                &[Channel::Application, Channel::System],
                24,
                now,
            )
            .await;

        // 매칭 안 된 레코드(999)는 신호가 아닙니다
        assert_eq!(signals.len(), 3);
        // 시각 내림차순
        assert_eq!(signals[0].pattern, "app_hang"); // 11시
        assert_eq!(signals[1].pattern, "hardware_error"); // 10시
        assert_eq!(signals[2].pattern, "app_crash"); // 8시
    }

    #[tokio::test]
    async fn scan_survives_single_channel_failure() {
        let source = MockSource::new()
            .failing(Channel::Application)
            .with_records(
                Channel::System,
                vec![record(Channel::System, 1, "Microsoft-Windows-WHEA-Logger", 18, 9)],
            );
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let signals = gate()
            .scan_for_incidents(
                &source,
                &[Channel::Application, Channel::System],
                24,
                now,
            )
            .await;
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].pattern, "hardware_error");
    }

    #[tokio::test]
    async fn scan_ties_preserve_channel_then_source_order() {
        // 같은 시각의 신호는 스캔 순서(채널, 소스)를 유지합니다
        let source = MockSource::new()
            .with_records(
                Channel::Application,
                vec![
                    record(Channel::Application, 10, "Application Error", 1000, 10),
                    record(Channel::Application, 11, "Application Hang", 1002, 10),
                ],
            )
            .with_records(
                Channel::System,
                vec![record(Channel::System, 12, "BugCheck", 1001, 10)],
            );
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let signals = gate()
            .scan_for_incidents(
                &source,
                &[Channel::Application, Channel::System],
                24,
                now,
            )
            .await;
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0].record.record_id, 10);
        assert_eq!(signals[1].record.record_id, 11);
        assert_eq!(signals[2].record.record_id, 12);
    }

    #[tokio::test]
    async fn scan_uses_batch_cap_and_lookback_window() {
        let source = MockSource::new().with_records(Channel::Application, vec![]);
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        gate()
            .scan_for_incidents(&source, &[Channel::Application], 24, now)
            .await;

        let windows = source.seen_windows.lock().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].max_results, SCAN_BATCH_CAP);
        assert_eq!(
            windows[0].start.unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap()
        );
        assert!(windows[0].end.is_none());
    }

    #[tokio::test]
    async fn scan_clamps_excessive_lookback() {
        let source = MockSource::new().with_records(Channel::Application, vec![]);
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        gate()
            .scan_for_incidents(&source, &[Channel::Application], 99_999, now)
            .await;

        let windows = source.seen_windows.lock().unwrap();
        // 168시간(7일)로 clamp
        assert_eq!(
            windows[0].start.unwrap(),
            now - chrono::Duration::hours(168)
        );
    }

    #[test]
    fn scan_filter_covers_every_pattern_code() {
        let filter = build_scan_filter(PATTERN_TABLE, 24);
        for pattern in PATTERN_TABLE {
            for code in pattern.event_codes {
                assert!(
                    filter.contains(&format!("EventID={code}")),
                    "scan filter missing code {code}"
                );
            }
        }
        assert!(filter.contains("timediff(@SystemTime) <= 86400000"));
    }

    #[test]
    fn scan_filter_passes_the_validator() {
        let filter = build_scan_filter(PATTERN_TABLE, 168);
        let validated = FilterValidator::validate(Some(&filter), &QueryLimits::default())
            .expect("scan filter must stay inside the safe subset")
            .expect("scan filter is never empty");
        assert_eq!(validated.as_str(), filter);
    }
}
