use thiserror::Error;

use crate::fs::FsError;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("failed to list {dir}")]
    List {
        dir: String,
        #[source]
        source: FsError,
    },

    #[error("failed to claim {file}")]
    Claim {
        file: String,
        #[source]
        source: FsError,
    },

    #[error("failed to recover {file} into the error directory")]
    Recover {
        file: String,
        #[source]
        source: FsError,
    },
}
