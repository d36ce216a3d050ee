use flate2::CrcReader;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::codec::Codec;
use crate::fs::{FileSystem, FileUri, FsError, FsRouter};
use crate::manager::{ClaimedFile, DirManager};
use crate::script::invoke_script;

use super::error::IngestError;

/// Per-worker knobs, shared by every worker in a pool.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Fixed destination directory. `None` when a destination script
    /// resolves targets instead.
    pub destination: Option<FileUri>,
    /// Destination-resolution script command line.
    pub destination_script: Option<String>,
    /// Work-transform script command line.
    pub transform_script: Option<String>,
    /// Timeout applied to every script invocation.
    pub script_timeout: Duration,
    /// Whether to CRC-verify the staged copy before publishing.
    pub verify: bool,
    /// Whether to drop a `<dest>.done` marker after publishing.
    pub done_file: bool,
    /// Daemon mode polls forever; batch mode stops on empty inbound.
    pub daemon: bool,
    /// Sleep between empty inbound scans in daemon mode.
    pub poll_interval: Duration,
}

/// One worker: claims files and drives each through the transfer
/// pipeline. All workers share the manager, so claiming stays exclusive.
pub struct IngestWorker {
    id: usize,
    manager: Arc<DirManager>,
    router: FsRouter,
    codec: Option<Arc<dyn Codec>>,
    opts: WorkerOptions,
}

impl IngestWorker {
    pub fn new(
        id: usize,
        manager: Arc<DirManager>,
        router: FsRouter,
        codec: Option<Arc<dyn Codec>>,
        opts: WorkerOptions,
    ) -> Self {
        Self {
            id,
            manager,
            router,
            codec,
            opts,
        }
    }

    /// Claim-and-process loop. Runs until shutdown fires or, in batch
    /// mode, the inbound directory drains. Shutdown is observed at file
    /// boundaries, so the file in flight always finishes.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(worker = self.id, daemon = self.opts.daemon, "worker started");
        loop {
            let next = if self.opts.daemon {
                self.manager
                    .poll_claim(self.opts.poll_interval, &mut shutdown)
                    .await
            } else {
                // batch runs also stop at the next file boundary when
                // asked, instead of insisting on a full drain
                match shutdown.try_recv() {
                    Err(broadcast::error::TryRecvError::Empty) => self.manager.claim().await,
                    _ => Ok(None),
                }
            };

            match next {
                Ok(Some(file)) => self.handle(file).await,
                Ok(None) => break,
                Err(e) => {
                    error!(worker = self.id, error = %e, "claim failed");
                    if !self.opts.daemon {
                        break;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.opts.poll_interval) => {}
                        _ = shutdown.recv() => break,
                    }
                }
            }
        }
        info!(worker = self.id, "worker stopped");
    }

    async fn handle(&self, mut file: ClaimedFile) {
        let claimed_as = file.uri.clone();
        match self.process(&mut file).await {
            Ok(dest) => {
                info!(worker = self.id, file = %claimed_as, dest = %dest, "transfer complete");
            }
            Err(e) => {
                error!(worker = self.id, file = %file.uri, error = %e, "transfer failed");
                self.manager.fail(&file).await;
            }
        }
    }

    /// Runs the full pipeline for one claimed file and returns the
    /// published destination. The working reference in `file` is updated
    /// when a transform script substitutes a new location, so terminal
    /// routing follows the substituted file.
    pub async fn process(&self, file: &mut ClaimedFile) -> Result<FileUri, IngestError> {
        if let Some(cmd) = &self.opts.transform_script {
            let out = invoke_script(cmd, &file.uri.to_string(), self.opts.script_timeout).await?;
            let transformed = FileUri::parse(&out).map_err(|e| IngestError::ScriptOutput {
                output: out.clone(),
                source: e,
            })?;
            let meta = self.router.resolve(&transformed)?.stat(&transformed).await?;
            debug!(worker = self.id, from = %file.uri, to = %transformed, "transform substituted work file");
            file.name = meta.name().to_string();
            file.len = meta.len;
            file.uri = transformed;
        }

        let mut dest = if let Some(cmd) = &self.opts.destination_script {
            let out = invoke_script(cmd, &file.uri.to_string(), self.opts.script_timeout).await?;
            FileUri::parse(&out).map_err(|e| IngestError::ScriptOutput {
                output: out.clone(),
                source: e,
            })?
        } else if let Some(dir) = &self.opts.destination {
            dir.join(&file.name)
        } else {
            return Err(IngestError::NoDestination);
        };
        if let Some(codec) = &self.codec {
            let has_ext = dest
                .file_name()
                .is_some_and(|n| n.ends_with(codec.extension()));
            if !has_ext {
                dest = dest.with_suffix(codec.extension());
            }
        }

        let staging = self.manager.staging_path_for(&file.uri, &dest);
        let dst_fs = self.router.resolve(&dest)?;
        let stg_fs = self.router.resolve(&staging)?;
        if let Some(parent) = dest.parent() {
            dst_fs.mkdir_all(&parent).await?;
        }
        if let Some(parent) = staging.parent() {
            stg_fs.mkdir_all(&parent).await?;
        }

        match self.copy_verify_publish(file, &dest, &staging, &stg_fs, &dst_fs).await {
            Ok(()) => {}
            Err(e) => {
                if let Err(del) = stg_fs.delete(&staging).await {
                    debug!(staging = %staging, error = %del, "staging cleanup skipped");
                }
                return Err(e);
            }
        }

        if let Some(codec) = &self.codec {
            codec.build_index(Arc::clone(&dst_fs), &dest).await?;
        }
        if self.opts.done_file {
            let marker = dest.with_suffix(".done");
            let mut w = dst_fs.writer(&marker)?;
            w.flush()
                .map_err(|e| FsError::io("create", marker.to_string(), e))?;
        }

        self.manager.complete(file).await;
        Ok(dest)
    }

    /// Steps 4 through 7: staged copy, size check, CRC verify, atomic
    /// publish. Any error leaves the partial staging file for the caller
    /// to discard.
    async fn copy_verify_publish(
        &self,
        file: &ClaimedFile,
        dest: &FileUri,
        staging: &FileUri,
        stg_fs: &Arc<dyn FileSystem>,
        dst_fs: &Arc<dyn FileSystem>,
    ) -> Result<(), IngestError> {
        let src_fs = self.router.resolve(&file.uri)?;

        let source_crc = {
            let src_fs = Arc::clone(&src_fs);
            let stg_fs = Arc::clone(stg_fs);
            let src = file.uri.clone();
            let stg = staging.clone();
            let codec = self.codec.clone();
            let verify = self.opts.verify;
            tokio::task::spawn_blocking(move || {
                copy_stream(&*src_fs, &*stg_fs, &src, &stg, codec.as_deref(), verify)
            })
            .await??
        };

        let staged = stg_fs.stat(staging).await?;
        if self.codec.is_none() && staged.len != file.len {
            return Err(IngestError::SizeMismatch {
                expected: file.len,
                actual: staged.len,
            });
        }

        if let Some(expected) = source_crc {
            let actual = {
                let stg_fs = Arc::clone(stg_fs);
                let stg = staging.clone();
                let codec = self.codec.clone();
                tokio::task::spawn_blocking(move || staged_crc(&*stg_fs, &stg, codec.as_deref()))
                    .await??
            };
            if actual != expected {
                return Err(IngestError::CrcMismatch { expected, actual });
            }
            debug!(file = %file.uri, crc = format!("{actual:#010x}"), "staged copy verified");
        }

        if dst_fs.exists(dest).await? {
            warn!(dest = %dest, "overwriting existing destination file");
            dst_fs.delete(dest).await?;
        }
        dst_fs.rename(staging, dest).await?;
        Ok(())
    }
}

/// Streams the source into the staging location, compressing through the
/// codec when configured. Returns the CRC-32 of the plain source bytes
/// when verification is on.
fn copy_stream(
    src_fs: &dyn FileSystem,
    stg_fs: &dyn FileSystem,
    src: &FileUri,
    staging: &FileUri,
    codec: Option<&dyn Codec>,
    verify: bool,
) -> Result<Option<u32>, IngestError> {
    let reader = src_fs.reader(src)?;
    let raw = stg_fs.writer(staging)?;

    let io_err = |e| FsError::io("copy", staging.to_string(), e);
    if verify {
        let mut crc_reader = CrcReader::new(reader);
        drain_into(&mut crc_reader, raw, codec).map_err(io_err)?;
        Ok(Some(crc_reader.crc().sum()))
    } else {
        let mut reader = reader;
        drain_into(&mut reader, raw, codec).map_err(io_err)?;
        Ok(None)
    }
}

fn drain_into(
    reader: &mut impl Read,
    raw: Box<dyn Write + Send>,
    codec: Option<&dyn Codec>,
) -> std::io::Result<()> {
    match codec {
        Some(codec) => {
            let mut writer = codec.wrap_writer(raw);
            std::io::copy(reader, &mut writer)?;
            writer.finish()
        }
        None => {
            let mut writer = raw;
            std::io::copy(reader, &mut writer)?;
            writer.flush()
        }
    }
}

/// Re-reads the staged file (decompressing when a codec is configured)
/// and returns the CRC-32 of the plain bytes.
fn staged_crc(
    stg_fs: &dyn FileSystem,
    staging: &FileUri,
    codec: Option<&dyn Codec>,
) -> Result<u32, IngestError> {
    let raw = stg_fs.reader(staging)?;
    let plain: Box<dyn Read + Send> = match codec {
        Some(codec) => codec.wrap_reader(raw),
        None => raw,
    };
    let mut crc_reader = CrcReader::new(plain);
    std::io::copy(&mut crc_reader, &mut std::io::sink())
        .map_err(|e| FsError::io("verify", staging.to_string(), e))?;
    Ok(crc_reader.crc().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::create_codec;
    use crate::fs::MemFs;
    use crate::manager::ManagedDirs;
    use std::io::Write as _;

    fn options() -> WorkerOptions {
        WorkerOptions {
            destination: Some(FileUri::parse("mem:/out").unwrap()),
            destination_script: None,
            transform_script: None,
            script_timeout: Duration::from_secs(5),
            verify: true,
            done_file: false,
            daemon: false,
            poll_interval: Duration::from_millis(10),
        }
    }

    async fn setup(opts: WorkerOptions, codec: Option<Arc<dyn Codec>>) -> (Arc<MemFs>, Arc<IngestWorker>) {
        let fs = Arc::new(MemFs::new());
        let dirs = ManagedDirs {
            inbound: FileUri::parse("mem:/in").unwrap(),
            work: FileUri::parse("mem:/work").unwrap(),
            error: FileUri::parse("mem:/error").unwrap(),
            staging: FileUri::parse("mem:/staging").unwrap(),
            complete: Some(FileUri::parse("mem:/complete").unwrap()),
        };
        for dir in [&dirs.inbound, &dirs.work, &dirs.error, &dirs.staging] {
            fs.mkdir_all(dir).await.unwrap();
        }
        fs.mkdir_all(dirs.complete.as_ref().unwrap()).await.unwrap();
        let manager = Arc::new(DirManager::new(fs.clone(), dirs, false));
        let router = FsRouter::new().register(fs.clone());
        let worker = Arc::new(IngestWorker::new(0, manager, router, codec, opts));
        (fs, worker)
    }

    fn put(fs: &MemFs, uri: &str, content: &[u8]) {
        let mut w = fs.writer(&FileUri::parse(uri).unwrap()).unwrap();
        w.write_all(content).unwrap();
    }

    fn read(fs: &MemFs, uri: &str) -> Vec<u8> {
        let mut r = fs.reader(&FileUri::parse(uri).unwrap()).unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_process_publishes_and_completes() {
        let (fs, worker) = setup(options(), None).await;
        put(&fs, "mem:/work/a.txt", b"payload");
        let mut file = ClaimedFile {
            name: "a.txt".into(),
            uri: FileUri::parse("mem:/work/a.txt").unwrap(),
            len: 7,
        };

        let dest = worker.process(&mut file).await.unwrap();
        assert_eq!(dest.to_string(), "mem:/out/a.txt");
        assert_eq!(read(&fs, "mem:/out/a.txt"), b"payload");
        assert!(fs.exists(&FileUri::parse("mem:/complete/a.txt").unwrap()).await.unwrap());
        // staging directory drained by the publish rename
        let staged = fs.list(&FileUri::parse("mem:/staging").unwrap()).await.unwrap();
        assert!(staged.is_empty());
    }

    #[tokio::test]
    async fn test_process_with_codec_appends_extension() {
        let (fs, worker) = setup(options(), Some(create_codec("gzip").unwrap())).await;
        put(&fs, "mem:/work/report.csv", b"1,2,3\n4,5,6\n");
        let mut file = ClaimedFile {
            name: "report.csv".into(),
            uri: FileUri::parse("mem:/work/report.csv").unwrap(),
            len: 12,
        };

        let dest = worker.process(&mut file).await.unwrap();
        assert_eq!(dest.to_string(), "mem:/out/report.csv.gz");

        let codec = create_codec("gzip").unwrap();
        let mut r = codec.wrap_reader(fs.reader(&dest).unwrap());
        let mut plain = Vec::new();
        r.read_to_end(&mut plain).unwrap();
        assert_eq!(plain, b"1,2,3\n4,5,6\n");
    }

    #[tokio::test]
    async fn test_done_marker_written_after_publish() {
        let mut opts = options();
        opts.done_file = true;
        let (fs, worker) = setup(opts, None).await;
        put(&fs, "mem:/work/a", b"x");
        let mut file = ClaimedFile {
            name: "a".into(),
            uri: FileUri::parse("mem:/work/a").unwrap(),
            len: 1,
        };

        worker.process(&mut file).await.unwrap();
        let marker = fs.stat(&FileUri::parse("mem:/out/a.done").unwrap()).await.unwrap();
        assert_eq!(marker.len, 0);
    }

    #[tokio::test]
    async fn test_no_destination_configured() {
        let mut opts = options();
        opts.destination = None;
        let (fs, worker) = setup(opts, None).await;
        put(&fs, "mem:/work/a", b"x");
        let mut file = ClaimedFile {
            name: "a".into(),
            uri: FileUri::parse("mem:/work/a").unwrap(),
            len: 1,
        };

        assert!(matches!(
            worker.process(&mut file).await,
            Err(IngestError::NoDestination)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_destination_script_resolves_target() {
        let mut opts = options();
        opts.destination = None;
        opts.destination_script =
            Some("/bin/sh -c 'read line; echo \"mem:/routed/$(basename \"$line\")\"'".into());
        let (fs, worker) = setup(opts, None).await;
        put(&fs, "mem:/work/a.txt", b"abc");
        let mut file = ClaimedFile {
            name: "a.txt".into(),
            uri: FileUri::parse("mem:/work/a.txt").unwrap(),
            len: 3,
        };

        let dest = worker.process(&mut file).await.unwrap();
        assert_eq!(dest.to_string(), "mem:/routed/a.txt");
        assert_eq!(read(&fs, "mem:/routed/a.txt"), b"abc");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_output_without_scheme_is_rejected() {
        let mut opts = options();
        opts.destination = None;
        opts.destination_script = Some("/bin/sh -c 'echo /no/scheme/here'".into());
        let (fs, worker) = setup(opts, None).await;
        put(&fs, "mem:/work/a", b"x");
        let mut file = ClaimedFile {
            name: "a".into(),
            uri: FileUri::parse("mem:/work/a").unwrap(),
            len: 1,
        };

        assert!(matches!(
            worker.process(&mut file).await,
            Err(IngestError::ScriptOutput { .. })
        ));
    }
}
