//! Worker pool supervision.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::codec::Codec;
use crate::fs::FsRouter;
use crate::manager::{DirManager, ManagerError};
use crate::worker::{IngestWorker, WorkerOptions};

/// Supervises N ingest workers over one shared manager.
///
/// Startup runs the crash-recovery sweep before any worker can claim.
/// Shutdown is cooperative: workers get a broadcast signal and finish
/// their in-flight file before exiting, so `shutdown()` is bounded by
/// the slowest active transfer.
pub struct WorkerPool {
    manager: Arc<DirManager>,
    router: FsRouter,
    codec: Option<Arc<dyn Codec>>,
    opts: WorkerOptions,
    worker_count: usize,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(
        manager: Arc<DirManager>,
        router: FsRouter,
        codec: Option<Arc<dyn Codec>>,
        opts: WorkerOptions,
        worker_count: usize,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            manager,
            router,
            codec,
            opts,
            worker_count,
            running: AtomicBool::new(false),
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// Sweeps orphaned work files into the error directory, then spawns
    /// the workers.
    pub async fn start(&mut self) -> Result<(), ManagerError> {
        let recovered = self.manager.recover_orphans().await?;
        if recovered > 0 {
            warn!(recovered, "moved orphaned work files into the error directory");
        }

        self.running.store(true, Ordering::SeqCst);
        for id in 0..self.worker_count {
            let worker = Arc::new(IngestWorker::new(
                id,
                Arc::clone(&self.manager),
                self.router.clone(),
                self.codec.clone(),
                self.opts.clone(),
            ));
            let shutdown_rx = self.shutdown_tx.subscribe();
            self.handles.push(tokio::spawn(worker.run(shutdown_rx)));
        }
        info!(workers = self.worker_count, "worker pool started");
        Ok(())
    }

    /// Signals every worker to stop and waits for them to finish.
    pub async fn shutdown(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("worker pool shutting down");
        // Errors only when no worker is subscribed anymore.
        let _ = self.shutdown_tx.send(());
        self.join_workers().await;
    }

    /// Waits for every worker to finish without signalling. Batch runs
    /// end this way once the inbound directory drains.
    pub async fn await_termination(&mut self) {
        self.join_workers().await;
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn join_workers(&mut self) {
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task aborted");
            }
        }
        info!("all workers stopped");
    }
}
