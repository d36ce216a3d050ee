//! Compression codecs for the copy stream.
//!
//! A codec wraps the staging writer so the destination file is produced
//! compressed in one pass, and advertises the canonical extension the
//! published name must carry.

mod error;
mod gzip;
mod traits;

use std::sync::Arc;

pub use error::CodecError;
pub use gzip::GzipCodec;
pub use traits::{Codec, FinishWrite};

/// Returns the codec registered under `name`.
pub fn create_codec(name: &str) -> Result<Arc<dyn Codec>, CodecError> {
    match name {
        "gzip" => Ok(Arc::new(GzipCodec::new())),
        other => Err(CodecError::Unknown {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_known_codec() {
        let codec = create_codec("gzip").unwrap();
        assert_eq!(codec.name(), "gzip");
        assert_eq!(codec.extension(), ".gz");
    }

    #[test]
    fn test_create_unknown_codec() {
        assert!(matches!(
            create_codec("snappy"),
            Err(CodecError::Unknown { .. })
        ));
    }
}
