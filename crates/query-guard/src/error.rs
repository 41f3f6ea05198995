//! 쿼리 게이트 에러 타입
//!
//! [`QueryGuardError`]는 검증/실행 단계에서 발생하는 모든 에러를 표현합니다.
//! `From<QueryGuardError> for LogwardError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 호출자에게 노출되는 표면은 [`QueryGuardError::code`]의 고정 에러 코드와
//! [`QueryGuardError::safe_message`]의 일반화된 메시지입니다. collaborator
//! 내부 세부 사항(스택 트레이스, 프로세스 출력 등)은 절대 포함되지 않습니다.

use logward_core::error::{LogwardError, SourceError, ValidationError};

/// 쿼리 게이트 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum QueryGuardError {
    /// 채널이 allowlist에 없음
    ///
    /// 거부된 입력과 allowlist를 함께 담지만, 진단 용도일 뿐
    /// 자동 교정에 사용해서는 안 됩니다.
    #[error("channel rejected: '{requested}' is not in the allowlist {allowed:?}")]
    ChannelRejected {
        /// 거부된 입력 (문자열화)
        requested: String,
        /// 허용 채널 이름 목록
        allowed: Vec<&'static str>,
    },

    /// 필터에 차단된 구문 또는 허용되지 않는 문자가 포함됨
    #[error("filter rejected: {}", reasons.join("; "))]
    FilterRejected {
        /// 위반된 규칙 설명 목록 (전부 수집)
        reasons: Vec<String>,
    },

    /// 필터가 복잡도 한도를 초과함 (길이/깊이/술어 개수)
    #[error("filter too complex: {reason}")]
    FilterTooComplex {
        /// 초과된 한도 설명
        reason: String,
    },

    /// 타임스탬프 파싱 실패
    #[error("invalid timestamp: '{input}'")]
    InvalidTimestamp {
        /// 파싱에 실패한 입력
        input: String,
    },

    /// 쿼리 타임아웃 (이 코어는 재시도하지 않습니다)
    #[error("query timed out after {seconds}s")]
    Timeout {
        /// 적용된 타임아웃 (초)
        seconds: u64,
    },

    /// 로그 소스 에러 (카테고리만 통과, 재시도 없음)
    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

impl QueryGuardError {
    /// 고정 에러 코드를 반환합니다.
    ///
    /// 프로토콜 레이어는 이 코드를 그대로 호출자에게 전달합니다.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ChannelRejected { .. } => "CHANNEL_REJECTED",
            Self::FilterRejected { .. } => "FILTER_REJECTED",
            Self::FilterTooComplex { .. } => "FILTER_TOO_COMPLEX",
            Self::InvalidTimestamp { .. } => "INVALID_TIMESTAMP",
            Self::Timeout { .. } => "QUERY_TIMEOUT",
            Self::Source(_) => "SOURCE_ERROR",
        }
    }

    /// 호출자에게 안전하게 노출 가능한 일반 메시지를 반환합니다.
    ///
    /// 원본 입력이나 collaborator 세부 내용을 포함하지 않습니다.
    pub fn safe_message(&self) -> &'static str {
        match self {
            Self::ChannelRejected { .. } => "requested channel is not allowed",
            Self::FilterRejected { .. } => "filter expression contains disallowed constructs",
            Self::FilterTooComplex { .. } => "filter expression exceeds complexity limits",
            Self::InvalidTimestamp { .. } => "timestamp is not a recognized format",
            Self::Timeout { .. } => "query timed out",
            Self::Source(_) => "log source is unavailable",
        }
    }
}

impl From<QueryGuardError> for LogwardError {
    fn from(err: QueryGuardError) -> Self {
        match err {
            QueryGuardError::ChannelRejected { .. } => {
                LogwardError::Validation(ValidationError::Channel(err.to_string()))
            }
            QueryGuardError::FilterRejected { .. } | QueryGuardError::FilterTooComplex { .. } => {
                LogwardError::Validation(ValidationError::Filter(err.to_string()))
            }
            QueryGuardError::InvalidTimestamp { .. } | QueryGuardError::Timeout { .. } => {
                LogwardError::Validation(ValidationError::Window(err.to_string()))
            }
            QueryGuardError::Source(source) => LogwardError::Source(source),
        }
    }
}
