#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod source;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, LogwardError, SourceError, ValidationError};

// 설정
pub use config::{AuditConfig, GeneralConfig, LogwardConfig, QueryLimits, SourceConfig};

// 로그 소스 trait
pub use source::EventSource;

// 도메인 타입
pub use types::{
    ALLOWED_CHANNELS, Channel, ChannelInfo, EventLevel, EventRecord, FilterExpression,
    IncidentSeverity, IncidentSignal, QueryWindow,
};
