//! `logward scan` command handler

use std::io::Write;
use std::path::Path;

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use logward_core::config::LogwardConfig;
use logward_core::types::{IncidentSeverity, IncidentSignal};
use logward_query::{ChannelGuard, QueryGate};
use logward_winlog::PowerShellSource;

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = LogwardConfig::load(config_path).await?;
    let gate = QueryGate::new(config.query.clone());
    let source = PowerShellSource::new(&config.source);

    let min_severity = args
        .min_severity
        .as_deref()
        .map(parse_severity)
        .transpose()?;

    let channels = ChannelGuard::allowed_channels();
    info!(hours = args.hours, "scanning for incident signals");

    let mut signals = gate
        .scan_for_incidents(&source, &channels, args.hours, Utc::now())
        .await;

    if let Some(min) = min_severity {
        signals.retain(|signal| signal.severity >= min);
    }

    let report = build_scan_report(args.hours, &signals);
    writer.render(&report)?;

    if args.fail_on_critical && report.critical > 0 {
        return Err(CliError::Scan(format!(
            "found {} critical signal(s)",
            report.critical
        )));
    }

    Ok(())
}

fn parse_severity(s: &str) -> Result<IncidentSeverity, CliError> {
    match s.to_lowercase().as_str() {
        "medium" => Ok(IncidentSeverity::Medium),
        "high" => Ok(IncidentSeverity::High),
        "critical" => Ok(IncidentSeverity::Critical),
        _ => Err(CliError::Command(format!(
            "invalid severity: {} (expected: medium, high, critical)",
            s
        ))),
    }
}

fn build_scan_report(hours: u32, signals: &[IncidentSignal]) -> ScanReport {
    let mut critical = 0;
    let mut high = 0;
    let mut medium = 0;
    for signal in signals {
        match signal.severity {
            IncidentSeverity::Critical => critical += 1,
            IncidentSeverity::High => high += 1,
            IncidentSeverity::Medium => medium += 1,
        }
    }

    ScanReport {
        hours,
        total: signals.len(),
        critical,
        high,
        medium,
        signals: signals.iter().map(SignalView::from).collect(),
    }
}

#[derive(Debug, Serialize)]
struct ScanReport {
    hours: u32,
    total: usize,
    critical: usize,
    high: usize,
    medium: usize,
    signals: Vec<SignalView>,
}

/// Flattened signal for display.
#[derive(Debug, Serialize)]
struct SignalView {
    time_created: String,
    severity: String,
    pattern: String,
    channel: String,
    provider: String,
    event_id: u32,
    faulting_application: Option<String>,
    faulting_module: Option<String>,
}

impl From<&IncidentSignal> for SignalView {
    fn from(signal: &IncidentSignal) -> Self {
        Self {
            time_created: signal.record.time_created.to_rfc3339(),
            severity: signal.severity.to_string(),
            pattern: signal.pattern.clone(),
            channel: signal.record.channel.clone(),
            provider: signal.record.provider.clone(),
            event_id: signal.record.event_id,
            faulting_application: signal.faulting_application.clone(),
            faulting_module: signal.faulting_module.clone(),
        }
    }
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "{} signal(s) in the last {}h (critical: {}, high: {}, medium: {})",
            self.total, self.hours, self.critical, self.high, self.medium
        )?;
        for signal in &self.signals {
            let severity = match signal.severity.as_str() {
                "Critical" => signal.severity.as_str().red().bold().to_string(),
                "High" => signal.severity.as_str().yellow().to_string(),
                _ => signal.severity.clone(),
            };
            write!(
                w,
                "{} [{}] {} {} ({}) on {}",
                signal.time_created,
                severity,
                signal.pattern,
                signal.provider,
                signal.event_id,
                signal.channel
            )?;
            if let Some(app) = &signal.faulting_application {
                write!(w, " app={app}")?;
            }
            if let Some(module) = &signal.faulting_module {
                write!(w, " module={module}")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}
