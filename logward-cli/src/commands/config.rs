//! `logward config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logward_core::config::LogwardConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Attempt to load and validate the configuration file, reporting any errors.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let result = LogwardConfig::load(config_path).await;

    let report = match result {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Load and display the effective configuration
/// (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = LogwardConfig::load(config_path).await?;

    let toml_str = match section.as_deref() {
        None => toml::to_string_pretty(&config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("query") => toml::to_string_pretty(&config.query),
        Some("audit") => toml::to_string_pretty(&config.audit),
        Some("source") => toml::to_string_pretty(&config.source),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section '{}' (expected: general, query, audit, source)",
                other
            )));
        }
    }
    .map_err(|e| CliError::Command(format!("failed to serialize config: {e}")))?;

    writer.render(&ConfigShowReport {
        source: config_path.display().to_string(),
        section,
        content: toml_str,
    })?;

    Ok(())
}

#[derive(Debug, Serialize)]
struct ConfigValidationReport {
    source: String,
    valid: bool,
    errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.valid {
            writeln!(w, "{}: OK", self.source)
        } else {
            writeln!(w, "{}: INVALID", self.source)?;
            for error in &self.errors {
                writeln!(w, "  - {error}")?;
            }
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigShowReport {
    source: String,
    section: Option<String>,
    content: String,
}

impl Render for ConfigShowReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        write!(w, "{}", self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    #[tokio::test]
    async fn validate_reports_missing_file_as_invalid() {
        let writer = OutputWriter::new(OutputFormat::Text);
        let result = execute_validate(Path::new("/nonexistent/logward.toml"), &writer).await;
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[tokio::test]
    async fn validate_accepts_wellformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logward.toml");
        tokio::fs::write(&path, "[query]\nmax_results = 42\n")
            .await
            .unwrap();
        let writer = OutputWriter::new(OutputFormat::Text);
        execute_validate(&path, &writer).await.unwrap();
    }

    #[tokio::test]
    async fn show_rejects_unknown_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logward.toml");
        tokio::fs::write(&path, "").await.unwrap();
        let writer = OutputWriter::new(OutputFormat::Text);
        let result = execute_show(&path, Some("storage".to_owned()), &writer).await;
        assert!(matches!(result, Err(CliError::Command(_))));
    }

    #[test]
    fn validation_report_renders_errors() {
        let report = ConfigValidationReport {
            source: "logward.toml".to_owned(),
            valid: false,
            errors: vec!["bad value".to_owned()],
        };
        let mut buf = Vec::new();
        report.render_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("INVALID"));
        assert!(text.contains("bad value"));
    }
}
