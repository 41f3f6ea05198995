//! `logward channels` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use logward_core::config::LogwardConfig;
use logward_core::source::EventSource;
use logward_query::ChannelGuard;
use logward_winlog::PowerShellSource;

use crate::cli::ChannelsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `channels` command.
///
/// Lists every allowlisted channel; channels the source cannot reach are
/// shown as disabled placeholders rather than omitted.
pub async fn execute(
    _args: ChannelsArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = LogwardConfig::load(config_path).await?;
    let source = PowerShellSource::new(&config.source);
    let timeout = config.query.timeout();

    let mut channels = Vec::new();
    for channel in ChannelGuard::allowed_channels() {
        debug!(channel = %channel, "fetching channel info");
        let info = match source.channel_info(channel, timeout).await {
            Ok(info) => info,
            Err(_) => logward_core::types::ChannelInfo::unavailable(channel),
        };
        channels.push(ChannelReport {
            channel: info.channel.to_string(),
            enabled: info.enabled,
            record_count: info.record_count,
            oldest_record_id: info.oldest_record_id,
        });
    }

    writer.render(&ChannelListReport { channels })?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChannelListReport {
    channels: Vec<ChannelReport>,
}

#[derive(Debug, Serialize)]
struct ChannelReport {
    channel: String,
    enabled: bool,
    record_count: u64,
    oldest_record_id: Option<u64>,
}

impl Render for ChannelListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{:<14} {:<10} {:>12}", "CHANNEL", "STATE", "RECORDS")?;
        for channel in &self.channels {
            let state = if channel.enabled {
                "enabled".green().to_string()
            } else {
                "disabled".red().to_string()
            };
            writeln!(
                w,
                "{:<14} {:<10} {:>12}",
                channel.channel, state, channel.record_count
            )?;
        }
        Ok(())
    }
}
