//! CLI-specific error types and exit code mapping

use logward_core::error::LogwardError;
use logward_query::QueryGuardError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The gate rejected the request (channel, filter, or window).
    #[error("request rejected [{code}]: {message}")]
    Rejected {
        /// Fixed error code from the gate.
        code: &'static str,
        /// Safe, generic message.
        message: &'static str,
    },

    /// Scan found signals at or above the failure threshold.
    #[error("scan error: {0}")]
    Scan(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logward-core.
    #[error("{0}")]
    Core(#[from] LogwardError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command error               |
    /// | 2    | Configuration error                   |
    /// | 3    | Request rejected by the gate          |
    /// | 4    | Scan found critical signals           |
    /// | 10   | IO error                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Rejected { .. } => 3,
            Self::Scan(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<QueryGuardError> for CliError {
    /// Gate rejections surface only the fixed code and the safe message;
    /// validation detail stays in the logs and the audit trail.
    fn from(e: QueryGuardError) -> Self {
        Self::Rejected {
            code: e.code(),
            message: e.safe_message(),
        }
    }
}
