//! Local disk filesystem provider.

use async_trait::async_trait;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use tokio::fs;

use super::error::FsError;
use super::traits::FileSystem;
use super::types::{FileMeta, FileUri};

const SCHEME: &str = "file";

/// Filesystem provider for the `file:` scheme, backed by local disk.
#[derive(Debug, Default, Clone)]
pub struct LocalFs;

impl LocalFs {
    /// Creates a new local filesystem provider.
    pub fn new() -> Self {
        Self
    }

    fn check(&self, uri: &FileUri) -> Result<PathBuf, FsError> {
        if uri.scheme() != SCHEME {
            return Err(FsError::WrongScheme {
                expected: SCHEME,
                path: uri.to_string(),
            });
        }
        Ok(uri.path().to_path_buf())
    }

    fn meta_for(uri: FileUri, meta: &std::fs::Metadata) -> FileMeta {
        FileMeta {
            uri,
            len: meta.len(),
            is_dir: meta.is_dir(),
        }
    }
}

#[async_trait]
impl FileSystem for LocalFs {
    fn scheme(&self) -> &str {
        SCHEME
    }

    async fn list(&self, dir: &FileUri) -> Result<Vec<FileMeta>, FsError> {
        let path = self.check(dir)?;
        let mut read_dir = fs::read_dir(&path)
            .await
            .map_err(|e| FsError::io("list", dir.to_string(), e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| FsError::io("list", dir.to_string(), e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let meta = entry
                .metadata()
                .await
                .map_err(|e| FsError::io("stat", dir.join(name).to_string(), e))?;
            entries.push(Self::meta_for(dir.join(name), &meta));
        }
        Ok(entries)
    }

    async fn stat(&self, uri: &FileUri) -> Result<FileMeta, FsError> {
        let path = self.check(uri)?;
        let meta = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FsError::NotFound {
                    path: uri.to_string(),
                }
            } else {
                FsError::io("stat", uri.to_string(), e)
            }
        })?;
        Ok(Self::meta_for(uri.clone(), &meta))
    }

    async fn exists(&self, uri: &FileUri) -> Result<bool, FsError> {
        let path = self.check(uri)?;
        Ok(fs::try_exists(&path)
            .await
            .map_err(|e| FsError::io("stat", uri.to_string(), e))?)
    }

    async fn rename(&self, from: &FileUri, to: &FileUri) -> Result<(), FsError> {
        let from_path = self.check(from)?;
        let to_path = self.check(to)?;
        fs::rename(&from_path, &to_path)
            .await
            .map_err(|e| FsError::io("rename", from.to_string(), e))
    }

    async fn delete(&self, uri: &FileUri) -> Result<(), FsError> {
        let path = self.check(uri)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| FsError::io("delete", uri.to_string(), e))
    }

    async fn mkdir_all(&self, uri: &FileUri) -> Result<(), FsError> {
        let path = self.check(uri)?;
        fs::create_dir_all(&path)
            .await
            .map_err(|e| FsError::io("mkdir", uri.to_string(), e))
    }

    fn reader(&self, uri: &FileUri) -> Result<Box<dyn Read + Send>, FsError> {
        let path = self.check(uri)?;
        let file = std::fs::File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FsError::NotFound {
                    path: uri.to_string(),
                }
            } else {
                FsError::io("open", uri.to_string(), e)
            }
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn writer(&self, uri: &FileUri) -> Result<Box<dyn Write + Send>, FsError> {
        let path = self.check(uri)?;
        let file =
            std::fs::File::create(&path).map_err(|e| FsError::io("create", uri.to_string(), e))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}
