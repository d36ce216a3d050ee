//! Per-file transfer pipeline and worker loop.

mod error;
mod ingest;

pub use error::IngestError;
pub use ingest::{IngestWorker, WorkerOptions};
