use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::fs::FileUri;
use crate::manager::ManagedDirs;
use crate::worker::WorkerOptions;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub directories: DirectoriesConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
}

/// Pipeline directory locations, each a scheme-qualified URI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoriesConfig {
    pub inbound: FileUri,
    pub work: FileUri,
    pub error: FileUri,
    pub staging: FileUri,
    /// Archive for transferred sources; mutually exclusive with
    /// `transfer.remove_after_copy`
    #[serde(default)]
    pub complete: Option<FileUri>,
    /// Fixed destination directory; mutually exclusive with
    /// `scripts.destination`
    #[serde(default)]
    pub destination: Option<FileUri>,
}

/// Transfer behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Poll forever (daemon) vs. drain the inbound directory once (batch)
    #[serde(default)]
    pub daemon: bool,
    /// CRC-32 verify every staged copy before publishing
    #[serde(default)]
    pub verify: bool,
    /// Drop a `<dest>.done` marker after publishing
    #[serde(default)]
    pub done_file: bool,
    /// Delete sources after transfer instead of archiving them
    #[serde(default)]
    pub remove_after_copy: bool,
    /// Compression codec name (e.g. "gzip")
    #[serde(default)]
    pub compression: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_interval_ms: default_poll_interval_ms(),
            daemon: false,
            verify: false,
            done_file: false,
            remove_after_copy: false,
            compression: None,
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// External script hooks
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptsConfig {
    /// Destination-resolution command line
    #[serde(default)]
    pub destination: Option<String>,
    /// Work-transform command line
    #[serde(default)]
    pub transform: Option<String>,
    #[serde(default = "default_script_timeout")]
    pub timeout_secs: u64,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            destination: None,
            transform: None,
            timeout_secs: default_script_timeout(),
        }
    }
}

fn default_script_timeout() -> u64 {
    60
}

impl Config {
    /// The directory set the manager owns.
    pub fn managed_dirs(&self) -> ManagedDirs {
        ManagedDirs {
            inbound: self.directories.inbound.clone(),
            work: self.directories.work.clone(),
            error: self.directories.error.clone(),
            staging: self.directories.staging.clone(),
            complete: self.directories.complete.clone(),
        }
    }

    /// The per-worker knobs derived from this configuration.
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            destination: self.directories.destination.clone(),
            destination_script: self.scripts.destination.clone(),
            transform_script: self.scripts.transform.clone(),
            script_timeout: Duration::from_secs(self.scripts.timeout_secs),
            verify: self.transfer.verify,
            done_file: self.transfer.done_file,
            daemon: self.transfer.daemon,
            poll_interval: Duration::from_millis(self.transfer.poll_interval_ms),
        }
    }
}
