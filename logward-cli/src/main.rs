//! logward -- validated, read-only access to the Windows event log.
//!
//! Every request flows through the query gate (`logward-query`) before it
//! can reach the PowerShell-backed log source (`logward-winlog`).

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_deref());

    let writer = OutputWriter::new(cli.output);
    let result = run(cli, &writer).await;

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    match cli.command {
        Commands::Channels(args) => commands::channels::execute(args, &cli.config, writer).await,
        Commands::Query(args) => commands::query::execute(args, &cli.config, writer).await,
        Commands::Scan(args) => commands::scan::execute(args, &cli.config, writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, writer).await,
    }
}

/// Initialize the global tracing subscriber.
///
/// Priority: `--log-level` flag, then `RUST_LOG`, then `warn`.
/// CLI output goes to stdout via `OutputWriter`; log lines go to stderr
/// so JSON output stays machine-parseable.
fn init_tracing(level_override: Option<&str>) {
    let env_filter = match level_override {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
