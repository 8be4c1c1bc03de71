//! # Main Entry Point
//!
//! Wires the host together:
//! - Domain: host configuration and core types
//! - Infrastructure: module loader, path resolver, gateway, settings store
//! - Application: command pipeline and runtime orchestrator
//! - Interface: console shell

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::application::orchestrator::Orchestrator;
use crate::domain::config::HostConfig;
use crate::infrastructure::gateway::LocalGateway;
use crate::infrastructure::paths::PathResolver;
use crate::infrastructure::settings::FileSettingsStore;
use crate::interface::console::{Console, ConsoleNotifier};

/// Host process for hot-swappable chat-bot modules.
#[derive(Parser)]
#[command(name = "gantry", version)]
struct Cli {
    /// Path to the bot module archive to load
    module: Option<PathBuf>,

    /// Host configuration file
    #[arg(long, default_value = "data/config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HostConfig::load(&cli.config).context("Failed to load host configuration")?;

    // Logging Setup
    let data_dir = PathBuf::from(&config.system.data_dir);
    std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

    let file_appender = tracing_appender::rolling::never(&data_dir, "session.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("starting up...");

    // Services
    let gateway = Arc::new(LocalGateway::new(config.system.admin.clone()));
    let shell = Arc::new(ConsoleNotifier);
    let settings = Arc::new(FileSettingsStore::open(&data_dir.join("settings.json")));

    // Module location: CLI argument first, then the config.properties file
    // next to the executable.
    let exe_properties = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("config.properties")))
        .unwrap_or_else(|| PathBuf::from("config.properties"));
    let resolver = PathResolver::new()
        .check_arg(cli.module)
        .check_config(exe_properties);

    let orchestrator = Arc::new(Orchestrator::new(
        gateway.clone(),
        shell.clone(),
        settings,
        resolver,
        Duration::from_secs(config.system.shutdown_grace_secs),
    ));

    // Console shell
    let (quit_tx, mut quit_rx) = mpsc::unbounded_channel();
    let console = Arc::new(Console::new(
        orchestrator.clone(),
        gateway,
        shell,
        &config.console.admin_prefix,
        quit_tx,
    ));

    let (ready_tx, ready_rx) = oneshot::channel();
    let console_task = {
        let console = console.clone();
        tokio::spawn(async move { console.run(ready_tx).await })
    };

    // wait until the shell is up before driving the lifecycle
    let _ = ready_rx.await;

    orchestrator.request_reload();

    tokio::select! {
        _ = quit_rx.recv() => tracing::info!("quit requested"),
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    orchestrator.shutdown().await;
    console_task.abort();
    Ok(())
}
