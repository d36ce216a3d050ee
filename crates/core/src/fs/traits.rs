//! Trait definition for filesystem providers.

use async_trait::async_trait;
use std::io::{Read, Write};

use super::error::FsError;
use super::types::{FileMeta, FileUri};

/// A filesystem that can serve pipeline directories.
///
/// Directory-level operations are async; the byte-stream constructors
/// are synchronous because bulk copying runs on the blocking thread pool
/// where the streams are wrapped in CRC and compression adapters.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// The URI scheme this provider serves, e.g. `file`.
    fn scheme(&self) -> &str;

    /// Lists the direct entries of a directory.
    async fn list(&self, dir: &FileUri) -> Result<Vec<FileMeta>, FsError>;

    /// Returns metadata for a path.
    async fn stat(&self, path: &FileUri) -> Result<FileMeta, FsError>;

    /// Whether a path exists.
    async fn exists(&self, path: &FileUri) -> Result<bool, FsError>;

    /// Atomically renames `from` to `to`.
    ///
    /// Both locations must be on this filesystem. A reader never
    /// observes `to` in a partially-moved state.
    async fn rename(&self, from: &FileUri, to: &FileUri) -> Result<(), FsError>;

    /// Deletes a file.
    async fn delete(&self, path: &FileUri) -> Result<(), FsError>;

    /// Creates a directory and any missing parents.
    async fn mkdir_all(&self, dir: &FileUri) -> Result<(), FsError>;

    /// Opens a file for reading.
    fn reader(&self, path: &FileUri) -> Result<Box<dyn Read + Send>, FsError>;

    /// Creates (truncating) a file for writing.
    fn writer(&self, path: &FileUri) -> Result<Box<dyn Write + Send>, FsError>;
}
