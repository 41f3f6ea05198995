//! 에러 타입 -- 도메인별 에러 정의

/// Logward 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogwardError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 쿼리 검증 에러
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 로그 소스 에러
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 쿼리 검증 에러
///
/// 검증기 세부 에러(`logward-query`)가 상위 레이어로 전파될 때
/// 이 일반화된 형태로 수렴합니다. 호출자에게는 카테고리 수준의
/// 정보만 노출됩니다.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// 채널 allowlist 검증 실패
    #[error("channel rejected: {0}")]
    Channel(String),

    /// 필터 표현식 검증 실패
    #[error("filter rejected: {0}")]
    Filter(String),

    /// 시간 윈도우 / 결과 개수 검증 실패
    #[error("query window rejected: {0}")]
    Window(String),
}

/// 로그 소스 collaborator 에러
///
/// 소스 내부 세부 사항은 카테고리 문자열로만 전달됩니다.
/// 이 코어는 소스 에러를 재시도하지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// 소스에 접근할 수 없음 (프로세스 실행 실패, 채널 비활성화 등)
    #[error("source unavailable: {reason}")]
    Unavailable { reason: String },

    /// 쿼리 실행 실패
    #[error("source query failed: {reason}")]
    QueryFailed { reason: String },

    /// 소스 출력 디코딩 실패
    #[error("source output decode failed: {reason}")]
    Decode { reason: String },

    /// 쿼리 타임아웃
    #[error("source query timed out")]
    Timeout,
}
