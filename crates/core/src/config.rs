//! 설정 관리 -- logward.toml 파싱 및 런타임 설정
//!
//! [`LogwardConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGWARD_QUERY_MAX_RESULTS=500` 형식)
//! 3. 설정 파일 (`logward.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! 쿼리 한도([`QueryLimits`])는 프로세스 시작 시 한 번 로드되며
//! 이후 불변입니다.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogwardError};

/// Logward 통합 설정
///
/// `logward.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogwardConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 쿼리 한도
    #[serde(default)]
    pub query: QueryLimits,
    /// 감사 추적 설정
    #[serde(default)]
    pub audit: AuditConfig,
    /// 로그 소스 설정
    #[serde(default)]
    pub source: SourceConfig,
}

impl LogwardConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogwardError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogwardError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogwardError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogwardError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogwardError> {
        toml::from_str(toml_str).map_err(|e| {
            LogwardError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGWARD_{SECTION}_{FIELD}`
    /// 예: `LOGWARD_QUERY_MAX_RESULTS=500`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGWARD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGWARD_GENERAL_LOG_FORMAT");

        // Query limits
        override_u32(&mut self.query.max_results, "LOGWARD_QUERY_MAX_RESULTS");
        override_u32(
            &mut self.query.max_lookback_hours,
            "LOGWARD_QUERY_MAX_LOOKBACK_HOURS",
        );
        override_u64(&mut self.query.timeout_secs, "LOGWARD_QUERY_TIMEOUT_SECS");
        override_usize(
            &mut self.query.max_filter_length,
            "LOGWARD_QUERY_MAX_FILTER_LENGTH",
        );
        override_u32(
            &mut self.query.max_filter_depth,
            "LOGWARD_QUERY_MAX_FILTER_DEPTH",
        );
        override_u32(
            &mut self.query.max_filter_predicates,
            "LOGWARD_QUERY_MAX_FILTER_PREDICATES",
        );

        // Audit
        override_bool(&mut self.audit.enabled, "LOGWARD_AUDIT_ENABLED");
        override_string(&mut self.audit.path, "LOGWARD_AUDIT_PATH");

        // Source
        override_string(&mut self.source.shell_path, "LOGWARD_SOURCE_SHELL_PATH");
        override_csv(&mut self.source.shell_args, "LOGWARD_SOURCE_SHELL_ARGS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogwardError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.query.validate()?;

        // audit 경로 검증
        if self.audit.enabled && self.audit.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "audit.path".to_owned(),
                reason: "path must not be empty when audit is enabled".to_owned(),
            }
            .into());
        }

        // shell 경로 검증
        if self.source.shell_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.shell_path".to_owned(),
                reason: "shell path must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 쿼리 한도 -- 프로세스 전역 불변 설정
///
/// 검증기들은 이 구조체의 값만 참조하며, 런타임에 변경되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// 호출자에게 반환하는 최대 결과 개수
    pub max_results: u32,
    /// 최대 lookback 시간 (시간 단위)
    pub max_lookback_hours: u32,
    /// 쿼리 타임아웃 (초)
    pub timeout_secs: u64,
    /// 필터 표현식 최대 길이 (문자)
    pub max_filter_length: usize,
    /// 필터 술어 최대 중첩 깊이
    pub max_filter_depth: u32,
    /// 필터 술어 최대 개수
    pub max_filter_predicates: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_results: 1000,
            max_lookback_hours: 168,
            timeout_secs: 30,
            max_filter_length: 500,
            max_filter_depth: 5,
            max_filter_predicates: 10,
        }
    }
}

impl QueryLimits {
    /// 쿼리 타임아웃을 `Duration`으로 반환합니다.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 한도값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const MAX_RESULTS_CEILING: u32 = 100_000;
        const MAX_LOOKBACK_CEILING: u32 = 24 * 365; // 1 year
        const MAX_TIMEOUT_SECS: u64 = 600;
        const MAX_FILTER_LENGTH_CEILING: usize = 10_000;
        const MAX_DEPTH_CEILING: u32 = 64;
        const MAX_PREDICATES_CEILING: u32 = 256;

        if self.max_results == 0 || self.max_results > MAX_RESULTS_CEILING {
            return Err(ConfigError::InvalidValue {
                field: "query.max_results".to_owned(),
                reason: format!("must be 1-{MAX_RESULTS_CEILING}"),
            });
        }

        if self.max_lookback_hours == 0 || self.max_lookback_hours > MAX_LOOKBACK_CEILING {
            return Err(ConfigError::InvalidValue {
                field: "query.max_lookback_hours".to_owned(),
                reason: format!("must be 1-{MAX_LOOKBACK_CEILING}"),
            });
        }

        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "query.timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            });
        }

        if self.max_filter_length == 0 || self.max_filter_length > MAX_FILTER_LENGTH_CEILING {
            return Err(ConfigError::InvalidValue {
                field: "query.max_filter_length".to_owned(),
                reason: format!("must be 1-{MAX_FILTER_LENGTH_CEILING}"),
            });
        }

        if self.max_filter_depth == 0 || self.max_filter_depth > MAX_DEPTH_CEILING {
            return Err(ConfigError::InvalidValue {
                field: "query.max_filter_depth".to_owned(),
                reason: format!("must be 1-{MAX_DEPTH_CEILING}"),
            });
        }

        if self.max_filter_predicates == 0 || self.max_filter_predicates > MAX_PREDICATES_CEILING {
            return Err(ConfigError::InvalidValue {
                field: "query.max_filter_predicates".to_owned(),
                reason: format!("must be 1-{MAX_PREDICATES_CEILING}"),
            });
        }

        Ok(())
    }
}

/// 감사 추적 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// JSONL 감사 로그 파일 경로
    pub path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/var/log/logward/audit.jsonl".to_owned(),
        }
    }
}

/// 로그 소스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// PowerShell 실행 파일 경로
    pub shell_path: String,
    /// 셸 공통 인자
    pub shell_args: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            shell_path: "powershell.exe".to_owned(),
            shell_args: vec!["-NoProfile".to_owned(), "-NonInteractive".to_owned()],
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = LogwardConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.query.max_results, 1000);
        assert_eq!(config.query.max_lookback_hours, 168);
        assert_eq!(config.query.timeout_secs, 30);
        assert_eq!(config.query.max_filter_length, 500);
        assert_eq!(config.query.max_filter_depth, 5);
        assert_eq!(config.query.max_filter_predicates, 10);
        assert!(!config.audit.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = LogwardConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = LogwardConfig::parse("").unwrap();
        assert_eq!(config.query.max_results, 1000);
        assert_eq!(config.source.shell_path, "powershell.exe");
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[query]
max_results = 250
timeout_secs = 10
"#;
        let config = LogwardConfig::parse(toml).unwrap();
        assert_eq!(config.query.max_results, 250);
        assert_eq!(config.query.timeout_secs, 10);
        // 나머지는 기본값 유지
        assert_eq!(config.query.max_lookback_hours, 168);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn from_str_full_toml() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"

[query]
max_results = 500
max_lookback_hours = 72
timeout_secs = 15
max_filter_length = 300
max_filter_depth = 4
max_filter_predicates = 8

[audit]
enabled = true
path = "/tmp/logward-audit.jsonl"

[source]
shell_path = "pwsh"
shell_args = ["-NoProfile"]
"#;
        let config = LogwardConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.query.max_filter_depth, 4);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.path, "/tmp/logward-audit.jsonl");
        assert_eq!(config.source.shell_path, "pwsh");
        assert_eq!(config.source.shell_args, vec!["-NoProfile"]);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = LogwardConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            LogwardError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = LogwardConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_max_results() {
        let mut config = LogwardConfig::default();
        config.query.max_results = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_results"));
    }

    #[test]
    fn validate_rejects_oversized_filter_length() {
        let mut config = LogwardConfig::default();
        config.query.max_filter_length = 1_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_filter_length"));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = LogwardConfig::default();
        config.query.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_audit_path_when_enabled() {
        let mut config = LogwardConfig::default();
        config.audit.enabled = true;
        config.audit.path = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("audit.path"));
    }

    #[test]
    fn query_limits_timeout_as_duration() {
        let limits = QueryLimits::default();
        assert_eq!(limits.timeout(), Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn env_override_max_results() {
        let mut config = LogwardConfig::default();
        // SAFETY: serial_test로 단일 스레드 실행이 보장되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("LOGWARD_QUERY_MAX_RESULTS", "123") };
        config.apply_env_overrides();
        assert_eq!(config.query.max_results, 123);
        unsafe { std::env::remove_var("LOGWARD_QUERY_MAX_RESULTS") };
    }

    #[test]
    #[serial]
    fn env_override_invalid_number_keeps_original() {
        let mut config = LogwardConfig::default();
        // SAFETY: serial_test로 단일 스레드 실행이 보장되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("LOGWARD_QUERY_MAX_RESULTS", "not-a-number") };
        config.apply_env_overrides();
        assert_eq!(config.query.max_results, 1000); // 원래 값 유지
        unsafe { std::env::remove_var("LOGWARD_QUERY_MAX_RESULTS") };
    }

    #[test]
    #[serial]
    fn env_override_audit_enabled() {
        let mut config = LogwardConfig::default();
        // SAFETY: serial_test로 단일 스레드 실행이 보장되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("LOGWARD_AUDIT_ENABLED", "true") };
        config.apply_env_overrides();
        assert!(config.audit.enabled);
        unsafe { std::env::remove_var("LOGWARD_AUDIT_ENABLED") };
    }

    #[test]
    #[serial]
    fn env_override_shell_args_csv() {
        let mut config = LogwardConfig::default();
        // SAFETY: serial_test로 단일 스레드 실행이 보장되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("LOGWARD_SOURCE_SHELL_ARGS", "-NoProfile, -NoLogo") };
        config.apply_env_overrides();
        assert_eq!(config.source.shell_args, vec!["-NoProfile", "-NoLogo"]);
        unsafe { std::env::remove_var("LOGWARD_SOURCE_SHELL_ARGS") };
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = LogwardConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = LogwardConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.query.max_results, parsed.query.max_results);
        assert_eq!(config.audit.path, parsed.audit.path);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = LogwardConfig::from_file("/nonexistent/path/logward.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            LogwardError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
