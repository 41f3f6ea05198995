//! PowerShell 기반 이벤트 소스
//!
//! [`PowerShellSource`]는 검증 완료된 쿼리를 `Get-WinEvent` 한 줄
//! 스크립트로 변환하여 외부 프로세스로 실행합니다. 프로세스는
//! `kill_on_drop`으로 생성되므로 타임아웃 시 함께 종료됩니다.
//!
//! 시간 윈도우의 start/end는 디코딩 후 이 어댑터에서 적용합니다.
//! (`-FilterXPath`와 시간 해시테이블을 한 호출에 섞을 수 없습니다.)

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use logward_core::config::SourceConfig;
use logward_core::error::SourceError;
use logward_core::source::EventSource;
use logward_core::types::{
    ALLOWED_CHANNELS, Channel, ChannelInfo, EventRecord, FilterExpression, QueryWindow,
};

use crate::record::decode_events;

/// 이벤트 투영 속성 (스크립트와 [`crate::record::WinEventDto`]가 일치해야 함)
const EVENT_PROJECTION: &str = "RecordId, Id, LevelDisplayName, \
    @{n='TimeCreated';e={$_.TimeCreated.ToUniversalTime().ToString('o')}}, \
    ProviderName, Message, MachineName, Task, Opcode, KeywordsDisplayNames, \
    @{n='UserId';e={if ($_.UserId) { $_.UserId.Value }}}";

/// Get-WinEvent가 빈 결과에서 내는 에러 메시지의 고정 접두
const NO_EVENTS_MARKER: &str = "No events were found";

/// PowerShell `Get-WinEvent` 어댑터
pub struct PowerShellSource {
    shell_path: String,
    shell_args: Vec<String>,
}

impl PowerShellSource {
    /// 설정에서 소스를 생성합니다.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            shell_path: config.shell_path.clone(),
            shell_args: config.shell_args.clone(),
        }
    }

    /// 이벤트 조회 스크립트를 생성합니다.
    fn build_query_script(
        channel: Channel,
        filter: Option<&FilterExpression>,
        max_results: u32,
    ) -> String {
        let mut script = format!(
            "Get-WinEvent -LogName '{}' -MaxEvents {} -ErrorAction Stop",
            channel.as_str(),
            max_results
        );
        if let Some(filter) = filter {
            script.push_str(&format!(
                " -FilterXPath '{}'",
                escape_single_quoted(filter.as_str())
            ));
        }
        script.push_str(&format!(
            " | Select-Object {EVENT_PROJECTION} | ConvertTo-Json -Depth 4 -Compress"
        ));
        script
    }

    /// 채널 메타데이터 조회 스크립트를 생성합니다.
    fn build_info_script(channel: Channel) -> String {
        format!(
            "Get-WinEvent -ListLog '{}' -ErrorAction Stop | \
             Select-Object IsEnabled, RecordCount, OldestRecordNumber | \
             ConvertTo-Json -Compress",
            channel.as_str()
        )
    }

    /// 스크립트를 실행하고 stdout을 반환합니다.
    async fn run_script(&self, script: &str, timeout: Duration) -> Result<String, SourceError> {
        let mut command = Command::new(&self.shell_path);
        command
            .args(&self.shell_args)
            .arg("-Command")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(shell = %self.shell_path, "spawning event query");

        let child = command.spawn().map_err(|e| SourceError::Unavailable {
            reason: format!("failed to spawn '{}': {e}", self.shell_path),
        })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| SourceError::Timeout)?
            .map_err(|e| SourceError::QueryFailed {
                reason: format!("failed to collect output: {e}"),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // 매칭되는 이벤트가 없는 것은 에러가 아니라 빈 결과입니다
            if stderr.contains(NO_EVENTS_MARKER) {
                return Ok(String::new());
            }
            return Err(SourceError::QueryFailed {
                reason: format!(
                    "exit status {:?}: {}",
                    output.status.code(),
                    truncate(&stderr, 200)
                ),
            });
        }

        Ok(stdout)
    }
}

impl EventSource for PowerShellSource {
    async fn query_events(
        &self,
        channel: Channel,
        filter: Option<&FilterExpression>,
        window: &QueryWindow,
        timeout: Duration,
    ) -> Result<Vec<EventRecord>, SourceError> {
        let script = Self::build_query_script(channel, filter, window.max_results);
        let stdout = self.run_script(&script, timeout).await?;
        let mut records = decode_events(&stdout, channel)?;

        // 시간 윈도우는 디코딩 후 적용합니다.
        // end < start 순서는 검증하지 않으므로 그대로 교집합이 됩니다.
        if window.start.is_some() || window.end.is_some() {
            records.retain(|record| {
                window.start.is_none_or(|start| record.time_created >= start)
                    && window.end.is_none_or(|end| record.time_created <= end)
            });
        }

        Ok(records)
    }

    async fn channel_info(
        &self,
        channel: Channel,
        timeout: Duration,
    ) -> Result<ChannelInfo, SourceError> {
        let script = Self::build_info_script(channel);
        let stdout = match self.run_script(&script, timeout).await {
            Ok(stdout) => stdout,
            Err(err) => {
                // 접근 불가 채널은 생략하지 않고 비활성 placeholder로 보고합니다
                warn!(channel = %channel, error = %err, "channel info unavailable");
                return Ok(ChannelInfo::unavailable(channel));
            }
        };

        let dto: ChannelInfoDto =
            serde_json::from_str(stdout.trim()).map_err(|e| SourceError::Decode {
                reason: format!("unexpected -ListLog output: {e}"),
            })?;

        Ok(ChannelInfo {
            channel,
            enabled: dto.is_enabled.unwrap_or(false),
            record_count: dto.record_count.unwrap_or(0),
            oldest_record_id: dto.oldest_record_number,
        })
    }

    fn channels(&self) -> Vec<Channel> {
        ALLOWED_CHANNELS.to_vec()
    }
}

/// Get-WinEvent -ListLog 출력
#[derive(Debug, serde::Deserialize)]
struct ChannelInfoDto {
    #[serde(rename = "IsEnabled")]
    is_enabled: Option<bool>,
    #[serde(rename = "RecordCount")]
    record_count: Option<u64>,
    #[serde(rename = "OldestRecordNumber")]
    oldest_record_number: Option<u64>,
}

/// PowerShell 단일 따옴표 문자열 이스케이프 (`'` -> `''`)
fn escape_single_quoted(s: &str) -> String {
    s.replace('\'', "''")
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
