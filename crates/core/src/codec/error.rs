use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown compression codec: {name}")]
    Unknown { name: String },

    #[error("failed to build index for {path}")]
    Index {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
