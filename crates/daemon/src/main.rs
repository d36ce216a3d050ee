use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sluice_core::{
    create_codec, load_config, prepare_directories, validate_config, Codec, DirManager, FsRouter,
    WorkerPool,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("SLUICE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("sluiced {} loading configuration from {:?}", VERSION, config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let router = FsRouter::with_defaults();
    prepare_directories(&config, &router)
        .await
        .context("Directory setup failed")?;

    info!("Configuration loaded successfully");
    info!("Inbound directory: {}", config.directories.inbound);
    info!(
        "Mode: {}, workers: {}",
        if config.transfer.daemon { "daemon" } else { "batch" },
        config.transfer.workers
    );

    // Resolve the compression codec if configured
    let codec: Option<Arc<dyn Codec>> = match &config.transfer.compression {
        Some(name) => {
            let codec = create_codec(name).context("Unsupported compression codec")?;
            info!("Compressing transfers with {}", codec.name());
            Some(codec)
        }
        None => None,
    };

    // Wire the manager and the pool
    let source_fs = router
        .resolve(&config.directories.inbound)
        .context("No filesystem provider for the inbound directory")?;
    let manager = Arc::new(DirManager::new(
        source_fs,
        config.managed_dirs(),
        config.transfer.remove_after_copy,
    ));

    let mut pool = WorkerPool::new(
        manager,
        router,
        codec,
        config.worker_options(),
        config.transfer.workers,
    );
    pool.start().await.context("Failed to start worker pool")?;

    if config.transfer.daemon {
        shutdown_signal().await;
        info!("Shutdown signal received");
        pool.shutdown().await;
    } else {
        // Batch mode: workers stop on their own once inbound drains
        pool.await_termination().await;
    }

    info!("sluiced stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
