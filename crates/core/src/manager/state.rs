use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::fs::{FileSystem, FileUri};

use super::error::ManagerError;
use super::types::{ClaimedFile, ManagedDirs};

/// Owns the directory transitions of the pipeline.
///
/// Claiming is serialized through an internal lock so that concurrent
/// workers sharing one manager never race on the same inbound entry.
/// The rename into the work directory is what makes ownership
/// exclusive; the lock only prevents wasted claim attempts.
pub struct DirManager {
    fs: Arc<dyn FileSystem>,
    dirs: ManagedDirs,
    remove_after_copy: bool,
    claim_lock: Mutex<()>,
}

impl DirManager {
    pub fn new(fs: Arc<dyn FileSystem>, dirs: ManagedDirs, remove_after_copy: bool) -> Self {
        Self {
            fs,
            dirs,
            remove_after_copy,
            claim_lock: Mutex::new(()),
        }
    }

    /// Claims the next eligible inbound file, moving it into the work
    /// directory. Returns `None` when the inbound directory holds no
    /// eligible entry.
    ///
    /// Subdirectories and hidden files (dot-prefixed names) are skipped,
    /// which lets producers stage uploads as hidden files and rename
    /// them visible once complete.
    pub async fn claim(&self) -> Result<Option<ClaimedFile>, ManagerError> {
        let _guard = self.claim_lock.lock().await;

        let entries = self
            .fs
            .list(&self.dirs.inbound)
            .await
            .map_err(|e| ManagerError::List {
                dir: self.dirs.inbound.to_string(),
                source: e,
            })?;

        for entry in entries {
            if entry.is_dir || entry.name().starts_with('.') {
                continue;
            }
            let claimed = self.dirs.work.join(entry.name());
            self.fs
                .rename(&entry.uri, &claimed)
                .await
                .map_err(|e| ManagerError::Claim {
                    file: entry.uri.to_string(),
                    source: e,
                })?;
            // the inbound listing may be stale by the time the rename
            // lands, so the authoritative size comes from a fresh stat
            // of the work-directory copy
            let meta = self
                .fs
                .stat(&claimed)
                .await
                .map_err(|e| ManagerError::Claim {
                    file: claimed.to_string(),
                    source: e,
                })?;
            debug!(file = %claimed, len = meta.len, "claimed inbound file");
            return Ok(Some(ClaimedFile {
                name: entry.name().to_string(),
                uri: claimed,
                len: meta.len,
            }));
        }
        Ok(None)
    }

    /// Claims the next file, sleeping `interval` between empty polls.
    ///
    /// Returns `Ok(None)` when `shutdown` fires. The signal is checked
    /// before every claim attempt, so a busy inbound directory cannot
    /// delay shutdown past the file currently in flight. Cancellation
    /// never interrupts the claim rename itself, so a shutdown can't
    /// strand a half-claimed file.
    pub async fn poll_claim(
        &self,
        interval: Duration,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<Option<ClaimedFile>, ManagerError> {
        loop {
            match shutdown.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => {}
                _ => return Ok(None),
            }
            if let Some(claimed) = self.claim().await? {
                return Ok(Some(claimed));
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.recv() => return Ok(None),
            }
        }
    }

    /// Retires a successfully transferred source file: deletes it in
    /// remove-after-copy mode, otherwise archives it in the complete
    /// directory.
    ///
    /// The destination copy is already published at this point, so a
    /// failure here leaves a duplicate source behind rather than losing
    /// data. It is logged and not treated as a transfer failure.
    pub async fn complete(&self, file: &ClaimedFile) {
        if self.remove_after_copy {
            if let Err(e) = self.fs.delete(&file.uri).await {
                warn!(file = %file.uri, error = %e, "failed to remove transferred source");
            }
            return;
        }
        match &self.dirs.complete {
            Some(complete) => {
                let target = complete.join(&file.name);
                if let Err(e) = self.fs.rename(&file.uri, &target).await {
                    warn!(file = %file.uri, error = %e, "failed to archive transferred source");
                }
            }
            None => {
                warn!(file = %file.uri, "no complete directory configured, leaving file in work");
            }
        }
    }

    /// Parks a failed file in the error directory for operator
    /// inspection. Best effort: a file that can't be moved stays in the
    /// work directory and is swept by recovery at next startup.
    pub async fn fail(&self, file: &ClaimedFile) {
        let target = self.dirs.error.join(&file.name);
        if let Err(e) = self.fs.rename(&file.uri, &target).await {
            warn!(file = %file.uri, error = %e, "failed to move file into error directory");
        }
    }

    /// Moves every file left in the work directory into the error
    /// directory. Run once at startup, before any worker claims: files
    /// found here were mid-transfer when a previous run died, and their
    /// destination state is unknown.
    pub async fn recover_orphans(&self) -> Result<usize, ManagerError> {
        let entries = self
            .fs
            .list(&self.dirs.work)
            .await
            .map_err(|e| ManagerError::List {
                dir: self.dirs.work.to_string(),
                source: e,
            })?;

        let mut moved = 0;
        for entry in entries {
            if entry.is_dir {
                continue;
            }
            let target = self.dirs.error.join(entry.name());
            self.fs
                .rename(&entry.uri, &target)
                .await
                .map_err(|e| ManagerError::Recover {
                    file: entry.uri.to_string(),
                    source: e,
                })?;
            info!(file = %entry.uri, "recovered orphaned work file into error directory");
            moved += 1;
        }
        Ok(moved)
    }

    /// Returns a collision-free staging location for one transfer
    /// attempt. The name hashes the source and destination URIs with a
    /// random salt, so retries of the same file never reuse a stale
    /// partial.
    pub fn staging_path_for(&self, src: &FileUri, dest: &FileUri) -> FileUri {
        let mut hasher = Sha256::new();
        hasher.update(src.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(dest.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(Uuid::new_v4().as_bytes());
        self.dirs.staging.join(&format!("{:x}", hasher.finalize()))
    }
}
