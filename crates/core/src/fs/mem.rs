//! In-memory filesystem provider.
//!
//! Serves the `mem:` scheme from a process-shared tree. Useful as the
//! second filesystem in cross-filesystem setups (destination and staging
//! live here while the source directories stay on disk) and as a fault
//! injection point in tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::error::FsError;
use super::traits::FileSystem;
use super::types::{FileMeta, FileUri};

const SCHEME: &str = "mem";

#[derive(Default)]
struct Inner {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
}

/// Filesystem provider for the `mem:` scheme.
///
/// Clones share the same tree. A file written through [`writer`] becomes
/// visible in full when the writer is dropped, so readers never observe
/// partial content.
///
/// [`writer`]: FileSystem::writer
#[derive(Clone, Default)]
pub struct MemFs {
    inner: Arc<Mutex<Inner>>,
}

impl MemFs {
    /// Creates an empty in-memory filesystem with just a root directory.
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock().dirs.insert(PathBuf::from("/"));
        fs
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Inner holds no user code that can panic mid-mutation.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
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
}

struct MemWriter {
    path: PathBuf,
    buf: Vec<u8>,
    inner: Arc<Mutex<Inner>>,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MemWriter {
    fn drop(&mut self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner
            .files
            .insert(std::mem::take(&mut self.path), std::mem::take(&mut self.buf));
    }
}

fn is_direct_child(path: &Path, dir: &Path) -> bool {
    path.parent() == Some(dir)
}

#[async_trait]
impl FileSystem for MemFs {
    fn scheme(&self) -> &str {
        SCHEME
    }

    async fn list(&self, dir: &FileUri) -> Result<Vec<FileMeta>, FsError> {
        let path = self.check(dir)?;
        let inner = self.lock();
        if !inner.dirs.contains(&path) {
            if inner.files.contains_key(&path) {
                return Err(FsError::NotADirectory {
                    path: dir.to_string(),
                });
            }
            return Err(FsError::NotFound {
                path: dir.to_string(),
            });
        }

        let mut entries = Vec::new();
        for (file, bytes) in &inner.files {
            if is_direct_child(file, &path) {
                let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
                entries.push(FileMeta {
                    uri: dir.join(name),
                    len: bytes.len() as u64,
                    is_dir: false,
                });
            }
        }
        for sub in &inner.dirs {
            if is_direct_child(sub, &path) {
                let name = sub.file_name().and_then(|n| n.to_str()).unwrap_or("");
                entries.push(FileMeta {
                    uri: dir.join(name),
                    len: 0,
                    is_dir: true,
                });
            }
        }
        Ok(entries)
    }

    async fn stat(&self, uri: &FileUri) -> Result<FileMeta, FsError> {
        let path = self.check(uri)?;
        let inner = self.lock();
        if let Some(bytes) = inner.files.get(&path) {
            return Ok(FileMeta {
                uri: uri.clone(),
                len: bytes.len() as u64,
                is_dir: false,
            });
        }
        if inner.dirs.contains(&path) {
            return Ok(FileMeta {
                uri: uri.clone(),
                len: 0,
                is_dir: true,
            });
        }
        Err(FsError::NotFound {
            path: uri.to_string(),
        })
    }

    async fn exists(&self, uri: &FileUri) -> Result<bool, FsError> {
        let path = self.check(uri)?;
        let inner = self.lock();
        Ok(inner.files.contains_key(&path) || inner.dirs.contains(&path))
    }

    async fn rename(&self, from: &FileUri, to: &FileUri) -> Result<(), FsError> {
        let from_path = self.check(from)?;
        let to_path = self.check(to)?;
        let mut inner = self.lock();
        match inner.files.remove(&from_path) {
            Some(bytes) => {
                inner.files.insert(to_path, bytes);
                Ok(())
            }
            None => Err(FsError::NotFound {
                path: from.to_string(),
            }),
        }
    }

    async fn delete(&self, uri: &FileUri) -> Result<(), FsError> {
        let path = self.check(uri)?;
        let mut inner = self.lock();
        match inner.files.remove(&path) {
            Some(_) => Ok(()),
            None => Err(FsError::NotFound {
                path: uri.to_string(),
            }),
        }
    }

    async fn mkdir_all(&self, uri: &FileUri) -> Result<(), FsError> {
        let path = self.check(uri)?;
        let mut inner = self.lock();
        let mut current = path.as_path();
        loop {
            inner.dirs.insert(current.to_path_buf());
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(())
    }

    fn reader(&self, uri: &FileUri) -> Result<Box<dyn Read + Send>, FsError> {
        let path = self.check(uri)?;
        let inner = self.lock();
        match inner.files.get(&path) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(FsError::NotFound {
                path: uri.to_string(),
            }),
        }
    }

    fn writer(&self, uri: &FileUri) -> Result<Box<dyn Write + Send>, FsError> {
        let path = self.check(uri)?;
        Ok(Box::new(MemWriter {
            path,
            buf: Vec::new(),
            inner: Arc::clone(&self.inner),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let fs = MemFs::new();
        let dir = FileUri::parse("mem:/data").unwrap();
        fs.mkdir_all(&dir).await.unwrap();

        let file = dir.join("a.bin");
        let mut w = fs.writer(&file).unwrap();
        w.write_all(b"abc").unwrap();
        drop(w);

        let mut r = fs.reader(&file).unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"abc");

        let meta = fs.stat(&file).await.unwrap();
        assert_eq!(meta.len, 3);
        assert!(!meta.is_dir);
    }

    #[tokio::test]
    async fn test_file_invisible_until_writer_dropped() {
        let fs = MemFs::new();
        let file = FileUri::parse("mem:/pending.bin").unwrap();

        let mut w = fs.writer(&file).unwrap();
        w.write_all(b"half").unwrap();
        assert!(!fs.exists(&file).await.unwrap());
        drop(w);
        assert!(fs.exists(&file).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_direct_children_only() {
        let fs = MemFs::new();
        fs.mkdir_all(&FileUri::parse("mem:/a/b").unwrap()).await.unwrap();
        drop(fs.writer(&FileUri::parse("mem:/a/top.txt").unwrap()).unwrap());
        drop(fs.writer(&FileUri::parse("mem:/a/b/nested.txt").unwrap()).unwrap());

        let mut entries = fs.list(&FileUri::parse("mem:/a").unwrap()).await.unwrap();
        entries.sort_by(|x, y| x.name().cmp(y.name()).then(x.is_dir.cmp(&y.is_dir)));
        let names: Vec<_> = entries.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["b", "top.txt"]);
    }

    #[tokio::test]
    async fn test_rename_missing_file() {
        let fs = MemFs::new();
        let from = FileUri::parse("mem:/missing").unwrap();
        let to = FileUri::parse("mem:/other").unwrap();
        assert!(matches!(
            fs.rename(&from, &to).await,
            Err(FsError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_clones_share_tree() {
        let fs = MemFs::new();
        let other = fs.clone();
        drop(fs.writer(&FileUri::parse("mem:/shared").unwrap()).unwrap());
        assert!(other
            .exists(&FileUri::parse("mem:/shared").unwrap())
            .await
            .unwrap());
    }
}
