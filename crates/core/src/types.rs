//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.
//! 검증 로직 자체는 `logward-query`에 있으며, 여기에는
//! 검증 결과를 표현하는 타입만 둡니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 이벤트 로그 채널
///
/// 허용된 채널은 이 두 개가 전부입니다. "알 수 없는 채널" variant는
/// 존재하지 않습니다 -- allowlist를 통과하지 못한 입력은 값이 되지 못하고
/// 검증 단계에서 거부됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Application 채널
    Application,
    /// System 채널
    System,
}

/// 쿼리가 허용되는 채널의 전체 목록 (선언 순서 고정)
pub const ALLOWED_CHANNELS: [Channel; 2] = [Channel::Application, Channel::System];

impl Channel {
    /// 채널의 정확한 이름을 반환합니다.
    ///
    /// 이 이름과 바이트 단위로 일치하는 입력만 검증을 통과합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "Application",
            Self::System => "System",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 이벤트 레코드의 레벨 (5단계 고정)
///
/// Windows 이벤트 로그의 Level 필드에 대응합니다.
/// `Ord` 구현으로 레벨 비교가 가능합니다 (`Verbose < Info < Warning < Error < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EventLevel {
    /// 상세 추적 이벤트
    Verbose,
    /// 정보성 이벤트
    #[default]
    Info,
    /// 경고
    Warning,
    /// 오류
    Error,
    /// 치명적 오류
    Critical,
}

impl EventLevel {
    /// 문자열에서 레벨을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "verbose" => Some(Self::Verbose),
            "info" | "information" | "informational" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 이벤트 로그의 숫자 Level 값에서 변환합니다.
    ///
    /// 1=Critical, 2=Error, 3=Warning, 4=Info, 5=Verbose.
    /// 0(LogAlways)과 범위 밖 값은 Info로 수렴합니다.
    pub fn from_winlog_level(level: u8) -> Self {
        match level {
            1 => Self::Critical,
            2 => Self::Error,
            3 => Self::Warning,
            5 => Self::Verbose,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verbose => write!(f, "Verbose"),
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 검증을 통과한 필터 표현식
///
/// `FilterValidator`만이 이 타입을 생성해야 합니다. 내부 문자열은
/// 길이/괄호 균형/중첩 깊이/술어 개수/문자 whitelist/blocklist 검증을
/// 모두 통과한 상태이며, 검증기는 입력을 고치지 않고 trim만 수행합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterExpression(String);

impl FilterExpression {
    /// 검증기를 통과한 문자열로 생성합니다.
    ///
    /// `logward-query`의 `FilterValidator` 외부에서 호출하면
    /// 타입이 보장하는 불변 조건이 깨집니다.
    pub fn from_validated(expr: String) -> Self {
        Self(expr)
    }

    /// 내부 문자열 참조를 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 쿼리 시간 윈도우 및 결과 상한
///
/// start/end는 각각 독립적으로 선택 가능하며, end >= start 순서는
/// 검증하지 않습니다 -- 순서 처리는 로그 소스에 위임합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    /// 윈도우 시작 (포함)
    pub start: Option<DateTime<Utc>>,
    /// 윈도우 끝 (포함)
    pub end: Option<DateTime<Utc>>,
    /// 최대 결과 개수 (clamp 완료된 값)
    pub max_results: u32,
}

/// 정규화된 이벤트 레코드
///
/// 로그 소스가 반환하는 단일 이벤트입니다. record_id는 채널 내에서
/// 유일하며 단조 비감소입니다 (소스는 ID를 재사용하지 않습니다).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// 채널 내 레코드 ID
    pub record_id: u64,
    /// 이벤트 코드 (예: 1000 = 애플리케이션 크래시)
    pub event_id: u32,
    /// 레벨
    pub level: EventLevel,
    /// 생성 시각
    pub time_created: DateTime<Utc>,
    /// 공급자(provider) 이름
    pub provider: String,
    /// 메시지 본문
    pub message: String,
    /// 호스트명
    pub computer: String,
    /// 채널 이름
    pub channel: String,
    /// 태스크 번호 (있을 경우)
    pub task: Option<u16>,
    /// opcode (있을 경우)
    pub opcode: Option<u16>,
    /// 키워드 (있을 경우)
    pub keywords: Option<String>,
    /// 사용자 식별자 (있을 경우)
    pub user_sid: Option<String>,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}#{} {} event={}: {}",
            self.level, self.channel, self.record_id, self.provider, self.event_id, self.message,
        )
    }
}

/// 채널 메타데이터
///
/// 접근 불가능한 채널은 목록에서 생략하지 않고,
/// `enabled: false` + 0 카운트의 placeholder로 보고합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// 채널
    pub channel: Channel,
    /// 채널 활성화/접근 가능 여부
    pub enabled: bool,
    /// 레코드 개수
    pub record_count: u64,
    /// 가장 오래된 레코드 ID (있을 경우)
    pub oldest_record_id: Option<u64>,
}

impl ChannelInfo {
    /// 접근 불가능한 채널의 placeholder를 생성합니다.
    pub fn unavailable(channel: Channel) -> Self {
        Self {
            channel,
            enabled: false,
            record_count: 0,
            oldest_record_id: None,
        }
    }
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        write!(
            f,
            "{} ({}) records={}",
            self.channel, state, self.record_count,
        )
    }
}

/// 인시던트 심각도 (3단계 고정)
///
/// 매칭된 인시던트 패턴에서 결정적으로 파생됩니다.
/// `Ord` 구현으로 비교가 가능합니다 (`Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum IncidentSeverity {
    /// 중간 -- 행(hang) 등
    Medium,
    /// 높음 -- 애플리케이션 크래시, 서비스 장애
    High,
    /// 치명적 -- 시스템/하드웨어 수준 장애
    Critical,
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 인시던트 신호 -- 패턴에 매칭된 이벤트 레코드
///
/// 레코드 하나는 최대 하나의 패턴에만 분류됩니다 (선언 순서 우선).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentSignal {
    /// 원본 레코드
    pub record: EventRecord,
    /// 매칭된 패턴 이름
    pub pattern: String,
    /// 파생된 심각도
    pub severity: IncidentSeverity,
    /// 메시지에서 추출한 faulting application (있을 경우)
    pub faulting_application: Option<String>,
    /// 메시지에서 추출한 faulting module (있을 경우)
    pub faulting_module: Option<String>,
}

impl fmt::Display for IncidentSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} event={}",
            self.severity, self.pattern, self.record.provider, self.record.event_id,
        )?;
        if let Some(ref app) = self.faulting_application {
            write!(f, " app={app}")?;
        }
        Ok(())
    }
}
