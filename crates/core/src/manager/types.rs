use crate::fs::FileUri;

/// The pipeline directories, all on the source filesystem.
#[derive(Debug, Clone)]
pub struct ManagedDirs {
    /// Where producers drop new files.
    pub inbound: FileUri,
    /// Where claimed files live while a worker processes them.
    pub work: FileUri,
    /// Where failed files are parked for operator inspection.
    pub error: FileUri,
    /// Where partial destination copies are written before publishing.
    pub staging: FileUri,
    /// Where successfully transferred sources are archived. `None` when
    /// sources are removed after copy instead.
    pub complete: Option<FileUri>,
}

/// A file exclusively owned by one worker, already moved into the work
/// directory.
#[derive(Debug, Clone)]
pub struct ClaimedFile {
    /// Original file name, preserved across every transition.
    pub name: String,
    /// Current location in the work directory.
    pub uri: FileUri,
    /// Size in bytes at claim time.
    pub len: u64,
}
