use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sitepulse_service::bootstrap::build_prober;
use sitepulse_service::{Config, MonitoringScheduler, Prober, build_registry};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe a URL once and print the outcome as JSON
    Check {
        url: String,
        /// Override the configured probe timeout
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Check every stored site once
    Sweep,
    /// Check every stored site periodically until interrupted
    Run,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Check { url, timeout_ms } => {
            let prober = build_prober(&config)?;
            let outcome = prober.probe(&url, timeout_ms.unwrap_or(config.probe.timeout_ms)).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Sweep => {
            let registry = build_registry(&config).await?;
            let summary = registry.check_all(config.scheduler.concurrency).await?;
            println!(
                "checked {} sites: {} up, {} down, {} skipped, {} failed",
                summary.checked, summary.up, summary.down, summary.skipped, summary.failed
            );
        }
        Command::Run => {
            let registry = build_registry(&config).await?;
            let handle = MonitoringScheduler::new(registry, &config.scheduler)?.start();

            tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
            info!("Shutting down scheduler");
            handle.abort();
        }
        Command::Config => println!("{config}"),
    }

    Ok(())
}
