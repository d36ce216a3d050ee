use thiserror::Error;

use crate::codec::CodecError;
use crate::fs::FsError;
use crate::manager::ManagerError;
use crate::script::ScriptError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("script output {output:?} is not a usable location")]
    ScriptOutput {
        output: String,
        #[source]
        source: FsError,
    },

    #[error("no destination directory or destination script configured")]
    NoDestination,

    #[error("staged copy is {actual} bytes, source is {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("staged copy checksum {actual:#010x} does not match source checksum {expected:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("copy task failed")]
    CopyTask(#[from] tokio::task::JoinError),
}
