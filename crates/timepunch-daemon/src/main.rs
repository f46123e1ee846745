//! Timepunch Daemon
//!
//! Headless kiosk sync agent: keeps the connection to the remote
//! time-tracking service alive, drains the offline punch queue, and
//! purges records past retention. The kiosk UI links the library and
//! calls the punch gateway directly; this binary runs the background
//! half on unattended hardware.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use timepunch_core::config::load_config;
use timepunch_core::{OfflineQueue, tracing_init};

use timepunch_daemon::connection::Connection;
use timepunch_daemon::gateway::{GatewayTimeouts, PunchGateway};
use timepunch_daemon::photos::PhotoStore;
use timepunch_daemon::remote::{SoapSwipeClient, SwipeApi};
use timepunch_daemon::sync::SyncReconciler;
use timepunch_daemon::tasks::{spawn_cleanup_task, spawn_reconnect_task, spawn_sync_task};
use timepunch_daemon::throttle::PunchThrottle;

#[derive(Parser, Debug)]
#[command(name = "timepunch-daemon")]
#[command(version, about = "Timepunch kiosk sync agent")]
struct Args {
    /// Settings file path
    #[arg(long, default_value = "settings.json", env = "TIMEPUNCH_SETTINGS")]
    settings: PathBuf,

    /// Remote service endpoint override
    #[arg(long, env = "TIMEPUNCH_ENDPOINT")]
    endpoint: Option<String>,

    /// Offline queue file override
    #[arg(long, env = "TIMEPUNCH_QUEUE_PATH")]
    queue_path: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "warn"); defaults to the
    /// settings file's logging level.
    #[arg(long, env = "TIMEPUNCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "TIMEPUNCH_LOG_JSON")]
    log_json: bool,

    /// Run a single sync pass and exit (for diagnostics and cron use).
    #[arg(long)]
    sync_once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(Some(args.settings.as_path()))?;
    if let Some(endpoint) = args.endpoint {
        config.remote.endpoint = endpoint;
    }
    if let Some(queue_path) = args.queue_path {
        config.storage.queue_path = queue_path;
    }

    let level = args.log_level.unwrap_or_else(|| config.logging.level.clone());
    let log_filter = format!("timepunch_daemon={level},timepunch_core={level}");
    tracing_init::init_tracing(&log_filter, args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.remote.endpoint,
        queue = %config.storage.queue_path.display(),
        "Starting timepunch-daemon"
    );

    let api: Arc<dyn SwipeApi> = Arc::new(SoapSwipeClient::new(&config.remote)?);
    let connection = Arc::new(Connection::new(Arc::clone(&api)));

    // Initial connection attempt; starting offline is normal and must not
    // block the kiosk.
    if !connection.try_reconnect().await {
        warn!(
            error = ?connection.last_error(),
            "Initial connection failed, starting in offline mode"
        );
    }

    let queue = Arc::new(OfflineQueue::open(
        &config.storage.queue_path,
        config.storage.max_offline_records,
    )?);
    let photos = Arc::new(PhotoStore::new(
        &config.storage.photo_dir,
        config.remote.client_id,
    ));
    let gateway = Arc::new(PunchGateway::new(
        api,
        Arc::clone(&connection),
        Arc::clone(&queue),
        Arc::clone(&photos),
        PunchThrottle::default(),
        GatewayTimeouts::from_config(config.remote.timeout_secs),
    ));
    let reconciler = Arc::new(SyncReconciler::new(
        gateway,
        Arc::clone(&connection),
        Arc::clone(&queue),
        photos,
    ));

    if args.sync_once {
        let report = reconciler.sync().await;
        info!(
            total = report.total,
            synced = report.synced,
            failed = report.failed,
            error = ?report.error,
            "Sync pass complete"
        );
        return Ok(());
    }

    let (shutdown_tx, _) = tokio::sync::watch::channel(false);
    let reconnect_handle = spawn_reconnect_task(
        Arc::clone(&connection),
        Duration::from_secs(config.sync.reconnect_interval_secs),
        shutdown_tx.subscribe(),
    );
    let sync_handle = spawn_sync_task(
        reconciler,
        Duration::from_secs(config.sync.sync_interval_secs),
        shutdown_tx.subscribe(),
    );
    let cleanup_handle = spawn_cleanup_task(
        queue,
        config.storage.retention_days,
        Duration::from_secs(config.sync.cleanup_interval_secs),
        shutdown_tx.subscribe(),
    );

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    // Notify systemd that the agent is up (unix only).
    #[cfg(unix)]
    sd_notify::notify(true, &[sd_notify::NotifyState::Ready])?;

    #[cfg(unix)]
    let sigterm_future = sigterm.recv();
    #[cfg(not(unix))]
    let sigterm_future = std::future::pending::<Option<()>>();

    info!("timepunch-daemon ready");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        _ = sigterm_future => {
            info!("Received SIGTERM shutdown signal");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = reconnect_handle.await;
    let _ = sync_handle.await;
    let _ = cleanup_handle.await;

    info!("Daemon stopped");
    Ok(())
}
