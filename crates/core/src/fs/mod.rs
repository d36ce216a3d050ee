//! Filesystem abstraction for the ingest pipeline.
//!
//! Every location the pipeline touches is a [`FileUri`], a
//! scheme-qualified absolute path, and every operation goes through the
//! [`FileSystem`] trait. This keeps the claim/copy/publish logic
//! independent of where directories actually live: the inbound side and
//! the destination side may be served by different providers.
//!
//! Two providers ship with the crate:
//!
//! - [`LocalFs`] (`file:` scheme) backed by the local disk
//! - [`MemFs`] (`mem:` scheme), a shared in-memory tree used for
//!   cross-filesystem setups and in tests
//!
//! A [`FsRouter`] maps a URI's scheme to its registered provider.

mod error;
mod local;
mod mem;
mod router;
mod traits;
mod types;

pub use error::FsError;
pub use local::LocalFs;
pub use mem::MemFs;
pub use router::FsRouter;
pub use traits::FileSystem;
pub use types::{same_filesystem, FileMeta, FileUri};
