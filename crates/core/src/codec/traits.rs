use async_trait::async_trait;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::fs::{FileSystem, FileUri};

use super::error::CodecError;

/// A compressing writer that must be finalized before the file is
/// complete. Dropping without [`finish`](FinishWrite::finish) may leave
/// the trailer unwritten.
pub trait FinishWrite: Write + Send {
    /// Flushes remaining compressed data and writes the stream trailer.
    fn finish(self: Box<Self>) -> std::io::Result<()>;
}

/// A compression capability applied during the copy.
#[async_trait]
pub trait Codec: Send + Sync {
    /// Codec name as it appears in configuration, e.g. `gzip`.
    fn name(&self) -> &str;

    /// Canonical file extension including the dot, e.g. `.gz`.
    fn extension(&self) -> &str;

    /// Wraps a raw writer so bytes written to it come out compressed.
    fn wrap_writer(&self, inner: Box<dyn Write + Send>) -> Box<dyn FinishWrite>;

    /// Wraps a raw reader over compressed data, yielding plain bytes.
    fn wrap_reader(&self, inner: Box<dyn Read + Send>) -> Box<dyn Read + Send>;

    /// Post-publish hook for codecs whose format needs a sidecar index
    /// before the file is usable downstream. The default does nothing.
    async fn build_index(
        &self,
        _fs: Arc<dyn FileSystem>,
        _path: &FileUri,
    ) -> Result<(), CodecError> {
        Ok(())
    }
}
