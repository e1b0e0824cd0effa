//! # Flow CLI
//!
//! Inspect, lint and dry-run onboarding flows.

use clap::Parser;
use flow_cli::{CliArgs, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing on stderr, keeping stdout for command output.
///
/// Set `RUST_LOG` to control log levels (default: info,flow_core=debug,flow_client=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flow_core=debug,flow_client=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let output = match &args.command {
        Command::Layout(layout) => flow_cli::layout(layout)?,
        Command::Lint { file } => flow_cli::lint(file)?,
        Command::Run(run) => {
            let report = flow_cli::run(run)?;
            tracing::debug!("Dry run emitted {} events", report.events.len());
            serde_json::to_string_pretty(&report)?
        }
        Command::Fetch(fetch) => flow_cli::fetch(fetch).await?,
    };

    println!("{output}");
    Ok(())
}
