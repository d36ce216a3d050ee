//! Error types for filesystem operations.

use thiserror::Error;

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// A URI was expected to carry a scheme but did not.
    #[error("URI is missing a scheme: '{uri}'")]
    MissingScheme { uri: String },

    /// A URI could not be parsed.
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: &'static str },

    /// No filesystem provider is registered for the scheme.
    #[error("No filesystem registered for scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    /// A path handed to a provider belongs to a different scheme.
    #[error("Path '{path}' does not belong to the '{expected}' filesystem")]
    WrongScheme { expected: &'static str, path: String },

    /// The path does not exist.
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// Expected a directory but found something else.
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// An underlying I/O operation failed.
    #[error("{op} failed for {path}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Creates an I/O error for the given operation and path.
    pub fn io(op: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
