//! Nester dashboard CLI
//!
//! Command-line interface for the probe scan dashboard.

use std::path::PathBuf;

use clap::Parser;
use nester_dashboard::{load_config, Config, SiteMode};
use tracing::Level;

#[derive(Parser)]
#[command(name = "nester-dashboard")]
#[command(about = "Real-time dashboard for network scan probes")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server to poll (overrides config file)
    #[arg(long)]
    base_url: Option<String>,

    /// single_site or multi_site (overrides config file)
    #[arg(long)]
    mode: Option<SiteMode>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, base_url={:?}, mode={:?}, dashboard_port={:?}, log_level={:?}",
        args.config,
        args.base_url,
        args.mode,
        args.dashboard_port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    tracing::info!("Starting nester dashboard");
    tracing::debug!(
        "Poll every {:?}, request timeout {:?}, detail ttl {:?}",
        config.poll_interval(),
        config.request_timeout(),
        config.detail_ttl()
    );

    nester_dashboard::run(config).await?;

    Ok(())
}
