//! 감사 추적 -- 게이트 결정의 JSONL 기록
//!
//! [`AuditTrail`]은 수락/거부된 쿼리를 한 줄에 하나씩 JSON으로
//! 파일에 덧붙입니다. 감사 기록 실패는 경고 로그와 카운터로만 남기고
//! 쿼리 처리에 영향을 주지 않습니다.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use logward_core::metrics as metric_names;

use crate::error::QueryGuardError;
use crate::gate::QueryRequest;

/// 감사 엔트리 하나 -- 게이트 결정 한 건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// 엔트리 고유 ID (UUID v4)
    pub id: String,
    /// 기록 시각
    pub timestamp: DateTime<Utc>,
    /// 요청된 채널 (검증 전 원본 문자열)
    pub channel: String,
    /// 요청된 필터 (있을 경우)
    pub filter: Option<String>,
    /// 요청된 결과 한도 (있을 경우)
    pub max_results: Option<u32>,
    /// 결정 결과: "accepted" 또는 에러 코드
    pub outcome: String,
    /// 부가 설명 (거부 사유 등)
    pub detail: Option<String>,
}

impl AuditEntry {
    /// 수락된 요청의 엔트리를 생성합니다.
    pub fn accepted(request: &QueryRequest, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            channel: request.channel.clone(),
            filter: request.filter.clone(),
            max_results: request.max_results,
            outcome: "accepted".to_owned(),
            detail: None,
        }
    }

    /// 거부된 요청의 엔트리를 생성합니다.
    ///
    /// outcome에는 고정 에러 코드만 기록됩니다.
    pub fn rejected(
        request: &QueryRequest,
        error: &QueryGuardError,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            channel: request.channel.clone(),
            filter: request.filter.clone(),
            max_results: request.max_results,
            outcome: error.code().to_owned(),
            detail: Some(error.to_string()),
        }
    }
}

/// JSONL 감사 추적 기록기
pub struct AuditTrail {
    path: PathBuf,
}

impl AuditTrail {
    /// 주어진 경로에 기록하는 감사 추적기를 생성합니다.
    ///
    /// 파일과 상위 디렉토리는 첫 기록 시 생성됩니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 엔트리 하나를 파일 끝에 덧붙입니다.
    ///
    /// 실패는 호출자에게 전파되지 않습니다 -- 감사 불가가
    /// 쿼리 거부 사유가 되어서는 안 됩니다.
    pub async fn record(&self, entry: &AuditEntry) {
        if let Err(err) = self.append(entry).await {
            counter!(metric_names::AUDIT_WRITE_FAILURES_TOTAL).increment(1);
            warn!(path = %self.path.display(), error = %err, "audit write failed");
            return;
        }
        counter!(metric_names::AUDIT_ENTRIES_TOTAL).increment(1);
    }

    async fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_vec(entry).map_err(std::io::Error::other)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_request() -> QueryRequest {
        QueryRequest {
            channel: "Application".to_owned(),
            filter: Some("*[System[EventID=1000]]".to_owned()),
            start_time: None,
            end_time: None,
            max_results: Some(100),
        }
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn accepted_entry_has_accepted_outcome() {
        let entry = AuditEntry::accepted(&sample_request(), ts());
        assert_eq!(entry.outcome, "accepted");
        assert_eq!(entry.channel, "Application");
        assert!(entry.detail.is_none());
        assert_eq!(entry.id.len(), 36); // UUID v4
    }

    #[test]
    fn rejected_entry_records_error_code() {
        let err = QueryGuardError::ChannelRejected {
            requested: "Security".to_owned(),
            allowed: vec!["Application", "System"],
        };
        let mut request = sample_request();
        request.channel = "Security".to_owned();
        let entry = AuditEntry::rejected(&request, &err, ts());
        assert_eq!(entry.outcome, "CHANNEL_REJECTED");
        assert!(entry.detail.is_some());
    }

    #[test]
    fn entries_get_unique_ids() {
        let a = AuditEntry::accepted(&sample_request(), ts());
        let b = AuditEntry::accepted(&sample_request(), ts());
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn record_appends_one_json_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let trail = AuditTrail::new(&path);

        trail.record(&AuditEntry::accepted(&sample_request(), ts())).await;
        trail
            .record(&AuditEntry::rejected(
                &sample_request(),
                &QueryGuardError::FilterTooComplex {
                    reason: "depth".to_owned(),
                },
                ts(),
            ))
            .await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        // 각 줄은 AuditEntry로 되돌아와야 합니다
        let first: AuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.outcome, "accepted");
        let second: AuditEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.outcome, "FILTER_TOO_COMPLEX");
    }

    #[tokio::test]
    async fn record_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("audit.jsonl");
        let trail = AuditTrail::new(&path);
        trail.record(&AuditEntry::accepted(&sample_request(), ts())).await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn record_failure_is_swallowed() {
        // 디렉토리 경로를 파일로 지정하면 기록이 실패하지만 패닉/에러는 없습니다
        let dir = tempfile::tempdir().unwrap();
        let trail = AuditTrail::new(dir.path());
        trail.record(&AuditEntry::accepted(&sample_request(), ts())).await;
    }
}
