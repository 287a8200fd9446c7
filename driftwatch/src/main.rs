//! Driftwatch CLI: run one backup/drift cycle over the inventory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use driftwatch::inventory::load_inventory;
use driftwatch::transport::NetworkSessionFactory;
use driftwatch::{DriftConfig, Notifier, RunCoordinator, WebhookNotifier};

#[derive(Parser, Debug)]
#[command(name = "driftwatch", version, about = "Network configuration backup and drift detection")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "driftwatch.toml")]
    config: PathBuf,

    /// Path to the device inventory CSV.
    #[arg(long, default_value = "Device.csv")]
    inventory: PathBuf,

    /// Override the configured output root.
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Override the configured worker pool size.
    #[arg(long)]
    workers: Option<usize>,

    /// Capture and diff, but skip the notification push.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        DriftConfig::load(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        info!(
            "config file {} not found; using defaults",
            cli.config.display()
        );
        DriftConfig::default()
    };
    if let Some(root) = cli.output_root {
        config.output_root = root;
    }
    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }

    let devices = load_inventory(&cli.inventory)
        .with_context(|| format!("loading inventory from {}", cli.inventory.display()))?;
    info!("inventory loaded: {} devices", devices.len());

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; aborting in-flight captures");
            ctrl_c_cancel.cancel();
        }
    });

    let webhook = config.webhook.clone();
    let coordinator = RunCoordinator::new(config, Arc::new(NetworkSessionFactory))
        .with_cancellation(cancel);
    let summary = coordinator.run(devices).await?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    print!("{}", summary.format_status(&timestamp));

    if cli.dry_run {
        info!("dry run; notification skipped");
    } else if let Some(webhook) = webhook {
        let notifier = WebhookNotifier::new(&webhook)?;
        if let Err(e) = notifier.notify(&summary, &timestamp).await {
            error!("notification delivery failed: {e}");
        }
    }

    Ok(())
}
