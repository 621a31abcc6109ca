//! RuleStudio console server
//!
//! Serves the settings API and the engine proxy on one listener.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rulestudio::{ConsoleConfig, ConsoleModule};
use rulestudio_bootstrap::{AppConfig, init_logging};
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Name of the console entry under `modules` in the config file.
const CONSOLE_MODULE: &str = "console";

#[derive(Parser)]
#[command(name = "rulestudio-server")]
#[command(version, about = "RuleStudio console backend", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Raise console log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.verbose);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    init_logging(&config.logging, &config.server.home_dir);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        home_dir = %config.server.home_dir.display(),
        "rulestudio starting"
    );

    let console_config: ConsoleConfig = config.module_config(CONSOLE_MODULE)?;
    let module = ConsoleModule::init(console_config, &config.server.home_dir).await?;
    let monitor = module.start_health_monitor();

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "listening");

    axum::serve(listener, module.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(monitor) = monitor {
        monitor.stop().await;
    }
    info!("rulestudio stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
