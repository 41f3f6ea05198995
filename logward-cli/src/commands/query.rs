//! `logward query` command handler

use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use logward_core::config::LogwardConfig;
use logward_core::types::EventRecord;
use logward_query::{AuditEntry, AuditTrail, QueryGate, QueryRequest};
use logward_winlog::PowerShellSource;

use crate::cli::QueryArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `query` command.
///
/// Every request goes through the gate; rejected requests never reach
/// the log source. When auditing is enabled, both accepted and rejected
/// requests are recorded.
pub async fn execute(
    args: QueryArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = LogwardConfig::load(config_path).await?;
    let gate = QueryGate::new(config.query.clone());
    let source = PowerShellSource::new(&config.source);
    let audit = config
        .audit
        .enabled
        .then(|| AuditTrail::new(config.audit.path.clone()));

    let request = QueryRequest {
        channel: args.channel,
        filter: args.filter,
        start_time: args.start,
        end_time: args.end,
        max_results: args.max_results,
    };

    let prepared = match gate.prepare(&request) {
        Ok(prepared) => {
            if let Some(trail) = &audit {
                trail.record(&AuditEntry::accepted(&request, Utc::now())).await;
            }
            prepared
        }
        Err(err) => {
            if let Some(trail) = &audit {
                trail
                    .record(&AuditEntry::rejected(&request, &err, Utc::now()))
                    .await;
            }
            return Err(err.into());
        }
    };

    info!(channel = %prepared.channel, "executing query");
    let records = gate.execute(&source, &prepared).await?;

    let report = QueryReport {
        channel: prepared.channel.to_string(),
        total: records.len(),
        records: records.iter().map(RecordView::from).collect(),
    };
    writer.render(&report)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct QueryReport {
    channel: String,
    total: usize,
    records: Vec<RecordView>,
}

/// Flattened record for display.
#[derive(Debug, Serialize)]
struct RecordView {
    record_id: u64,
    time_created: String,
    level: String,
    provider: String,
    event_id: u32,
    message: String,
}

impl From<&EventRecord> for RecordView {
    fn from(record: &EventRecord) -> Self {
        Self {
            record_id: record.record_id,
            time_created: record.time_created.to_rfc3339(),
            level: record.level.to_string(),
            provider: record.provider.clone(),
            event_id: record.event_id,
            message: first_line(&record.message, 120),
        }
    }
}

/// First line of a message, truncated to `max` characters.
fn first_line(message: &str, max: usize) -> String {
    let line = message.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        let truncated: String = line.chars().take(max).collect();
        format!("{truncated}...")
    } else {
        line.to_owned()
    }
}

impl Render for QueryReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{} record(s) from {}", self.total, self.channel)?;
        for record in &self.records {
            writeln!(
                w,
                "#{:<10} {} [{:<8}] {} ({}): {}",
                record.record_id,
                record.time_created,
                record.level,
                record.provider,
                record.event_id,
                record.message
            )?;
        }
        Ok(())
    }
}
