use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use super::traits::{Codec, FinishWrite};

/// Gzip codec backed by flate2. Produces `.gz` files that need no
/// post-publish indexing.
#[derive(Debug, Default, Clone)]
pub struct GzipCodec;

impl GzipCodec {
    pub fn new() -> Self {
        Self
    }
}

impl FinishWrite for GzEncoder<Box<dyn Write + Send>> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        (*self).finish().map(|_| ())
    }
}

#[async_trait]
impl Codec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extension(&self) -> &str {
        ".gz"
    }

    fn wrap_writer(&self, inner: Box<dyn Write + Send>) -> Box<dyn FinishWrite> {
        Box::new(GzEncoder::new(inner, Compression::default()))
    }

    fn wrap_reader(&self, inner: Box<dyn Read + Send>) -> Box<dyn Read + Send> {
        Box::new(GzDecoder::new(inner))
    }
}
