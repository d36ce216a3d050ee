//! Types for the filesystem module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::error::FsError;

/// A scheme-qualified absolute location, e.g. `file:/data/in` or
/// `mem://cache/staging`.
///
/// The scheme selects the filesystem provider, the optional authority
/// (`host[:port]`) identifies the remote endpoint, and the path is
/// always absolute. `FileUri` is the only currency the pipeline uses for
/// locations; plain `Path`s never cross module boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileUri {
    scheme: String,
    authority: Option<String>,
    path: PathBuf,
}

impl FileUri {
    /// Parses a URI string, requiring a scheme and an absolute path.
    pub fn parse(uri: &str) -> Result<Self, FsError> {
        let trimmed = uri.trim();
        let colon = trimmed.find(':').ok_or_else(|| FsError::MissingScheme {
            uri: trimmed.to_string(),
        })?;

        let scheme = &trimmed[..colon];
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            || !scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        {
            return Err(FsError::InvalidUri {
                uri: trimmed.to_string(),
                reason: "malformed scheme",
            });
        }

        let rest = &trimmed[colon + 1..];
        let (authority, path) = if let Some(after) = rest.strip_prefix("//") {
            match after.find('/') {
                Some(slash) => (
                    Some(after[..slash].to_string()).filter(|a| !a.is_empty()),
                    &after[slash..],
                ),
                None => {
                    return Err(FsError::InvalidUri {
                        uri: trimmed.to_string(),
                        reason: "missing path after authority",
                    })
                }
            }
        } else {
            (None, rest)
        };

        if !path.starts_with('/') {
            return Err(FsError::InvalidUri {
                uri: trimmed.to_string(),
                reason: "path must be absolute",
            });
        }

        Ok(Self {
            scheme: scheme.to_string(),
            authority,
            path: PathBuf::from(path),
        })
    }

    /// Builds a URI from parts. The path must be absolute.
    pub fn new(scheme: &str, authority: Option<&str>, path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: scheme.to_string(),
            authority: authority.map(str::to_string),
            path: path.into(),
        }
    }

    /// The URI scheme, without the trailing colon.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The authority (`host[:port]`), if any.
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The absolute path component.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The final path component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Returns a URI for `name` appended under this one.
    pub fn join(&self, name: &str) -> Self {
        Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: self.path.join(name),
        }
    }

    /// Returns the parent directory URI, if this is not the root.
    pub fn parent(&self) -> Option<Self> {
        self.path.parent().map(|p| Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: p.to_path_buf(),
        })
    }

    /// Returns a URI with `suffix` appended to the final component.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let mut raw = self.path.clone().into_os_string();
        raw.push(suffix);
        Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: PathBuf::from(raw),
        }
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.authority {
            Some(auth) => write!(f, "{}://{}{}", self.scheme, auth, self.path.display()),
            None => write!(f, "{}:{}", self.scheme, self.path.display()),
        }
    }
}

impl TryFrom<String> for FileUri {
    type Error = FsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FileUri> for String {
    fn from(uri: FileUri) -> Self {
        uri.to_string()
    }
}

/// Metadata for a filesystem entry.
#[derive(Debug, Clone)]
pub struct FileMeta {
    /// Location of the entry.
    pub uri: FileUri,
    /// Size in bytes (0 for directories).
    pub len: u64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl FileMeta {
    /// The entry's final path component, or empty for the root.
    pub fn name(&self) -> &str {
        self.uri.file_name().unwrap_or("")
    }
}

/// Whether two URIs live on the same filesystem.
///
/// Two locations share a filesystem when their scheme and authority
/// (host and port, compared literally without DNS resolution) are equal.
/// Atomic renames are only possible between same-filesystem locations.
pub fn same_filesystem(a: &FileUri, b: &FileUri) -> bool {
    a.scheme() == b.scheme() && a.authority() == b.authority()
}
