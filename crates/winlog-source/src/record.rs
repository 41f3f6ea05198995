//! Get-WinEvent JSON 출력 디코딩
//!
//! PowerShell 스크립트는 `Select-Object`로 고정된 속성만 투영한 뒤
//! `ConvertTo-Json -Compress`로 직렬화합니다. 이벤트가 하나면 객체,
//! 여러 개면 배열이 출력되므로 두 형태를 모두 받습니다.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use logward_core::error::SourceError;
use logward_core::types::{Channel, EventLevel, EventRecord};

/// Get-WinEvent 출력의 이벤트 하나
#[derive(Debug, Deserialize)]
pub struct WinEventDto {
    #[serde(rename = "RecordId")]
    pub record_id: Option<u64>,
    #[serde(rename = "Id")]
    pub id: u32,
    #[serde(rename = "LevelDisplayName")]
    pub level_display_name: Option<String>,
    /// ISO-8601 round-trip 형식 (스크립트에서 `ToString('o')`로 투영)
    #[serde(rename = "TimeCreated")]
    pub time_created: String,
    #[serde(rename = "ProviderName")]
    pub provider_name: Option<String>,
    #[serde(rename = "Message")]
    pub message: Option<String>,
    #[serde(rename = "MachineName")]
    pub machine_name: Option<String>,
    #[serde(rename = "Task")]
    pub task: Option<u16>,
    #[serde(rename = "Opcode")]
    pub opcode: Option<u16>,
    #[serde(rename = "KeywordsDisplayNames")]
    pub keywords_display_names: Option<Vec<String>>,
    #[serde(rename = "UserId")]
    pub user_id: Option<String>,
}

impl WinEventDto {
    /// DTO를 코어 [`EventRecord`]로 변환합니다.
    pub fn into_record(self, channel: Channel) -> Result<EventRecord, SourceError> {
        let time_created = DateTime::parse_from_rfc3339(&self.time_created)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SourceError::Decode {
                reason: format!("bad TimeCreated '{}': {e}", self.time_created),
            })?;

        let level = self
            .level_display_name
            .as_deref()
            .and_then(EventLevel::from_str_loose)
            .unwrap_or_default();

        let keywords = self.keywords_display_names.and_then(|names| {
            if names.is_empty() {
                None
            } else {
                Some(names.join(","))
            }
        });

        Ok(EventRecord {
            record_id: self.record_id.unwrap_or(0),
            event_id: self.id,
            level,
            time_created,
            provider: self.provider_name.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
            computer: self.machine_name.unwrap_or_default(),
            channel: channel.as_str().to_owned(),
            task: self.task,
            opcode: self.opcode,
            keywords,
            user_sid: self.user_id,
        })
    }
}

/// 단일 객체 또는 배열 payload
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Many(Vec<WinEventDto>),
    One(Box<WinEventDto>),
}

/// JSON 출력 전체를 [`EventRecord`] 목록으로 디코딩합니다.
///
/// 빈 출력(이벤트 없음)은 빈 목록입니다.
pub fn decode_events(json: &str, channel: Channel) -> Result<Vec<EventRecord>, SourceError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let payload: Payload = serde_json::from_str(trimmed).map_err(|e| SourceError::Decode {
        reason: format!("unexpected Get-WinEvent output: {e}"),
    })?;

    let dtos = match payload {
        Payload::Many(dtos) => dtos,
        Payload::One(dto) => vec![*dto],
    };

    dtos.into_iter()
        .map(|dto| dto.into_record(channel))
        .collect()
}
