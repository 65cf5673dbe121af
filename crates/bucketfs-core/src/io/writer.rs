//! Sequential writes spilled to local part files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use super::StreamRegistry;
use crate::error::{FsError, FsResult};
use crate::lock::PrefixLock;
use crate::multipart::{MultipartUploadCoordinator, PartHandle, UploadHandle};
use crate::path::FsPath;

/// Counters kept per writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterStats {
    /// Bytes accepted by `write`.
    pub bytes_written: u64,
    /// Number of `write` calls.
    pub write_ops: u64,
    /// Parts uploaded so far.
    pub parts_uploaded: u32,
}

/// A local file holding the bytes of the part being assembled. Removed on
/// drop.
#[derive(Debug)]
struct SpillFile {
    file: tokio::fs::File,
    path: PathBuf,
    len: usize,
}

impl SpillFile {
    fn create(dir: &Path) -> FsResult<Self> {
        let named = tempfile::Builder::new()
            .prefix("output-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        let (file, temp_path) = named.into_parts();
        let path = temp_path.keep().map_err(|e| e.error)?;
        trace!(path = %path.display(), "spill file created");
        Ok(Self {
            file: tokio::fs::File::from_std(file),
            path,
            len: 0,
        })
    }
}

impl Drop for SpillFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove spill file");
            }
        } else {
            trace!(path = %self.path.display(), "removed spill file");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterStatus {
    Open,
    Closed,
    Poisoned,
}

/// Everything a writer owns. Shared with the stream registry so shutdown can
/// close writers the caller abandoned.
#[derive(Debug)]
pub(crate) struct WriterState {
    path: FsPath,
    coordinator: MultipartUploadCoordinator,
    upload: UploadHandle,
    spill_dir: PathBuf,
    part_size: usize,
    spill: Option<SpillFile>,
    parts: Vec<PartHandle>,
    next_part: u32,
    stats: WriterStats,
    lock: Option<PrefixLock>,
    status: WriterStatus,
}

impl WriterState {
    async fn write(&mut self, buf: &[u8]) -> FsResult<()> {
        self.ensure_open()?;
        let result = self.write_parts(buf).await;
        if result.is_err() {
            self.poison();
        }
        self.stats.write_ops += 1;
        result
    }

    async fn write_parts(&mut self, buf: &[u8]) -> FsResult<()> {
        let part_size = self.part_size;
        let mut rest = buf;
        loop {
            let spill = self.spill_file()?;
            if spill.len + rest.len() <= part_size {
                break;
            }
            let take = part_size - spill.len;
            spill.file.write_all(&rest[..take]).await?;
            spill.len += take;
            self.stats.bytes_written += take as u64;
            rest = &rest[take..];
            self.upload_part().await?;
        }
        let spill = self.spill_file()?;
        spill.file.write_all(rest).await?;
        spill.len += rest.len();
        self.stats.bytes_written += rest.len() as u64;
        Ok(())
    }

    async fn flush(&mut self) -> FsResult<()> {
        self.ensure_open()?;
        if let Some(spill) = self.spill.as_mut() {
            spill.file.flush().await?;
        }
        Ok(())
    }

    /// Upload the current spill file as the next part and start a new one.
    async fn upload_part(&mut self) -> FsResult<()> {
        let Some(mut spill) = self.spill.take() else {
            return Ok(());
        };
        spill.file.flush().await?;
        let part = self
            .coordinator
            .put_part(&self.upload, self.next_part, &spill.path, spill.len as u64)
            .await?;
        trace!(path = %self.path, part_number = part.part_number, "part staged");
        self.parts.push(part);
        self.next_part += 1;
        self.stats.parts_uploaded += 1;
        drop(spill);
        self.spill = Some(SpillFile::create(&self.spill_dir)?);
        Ok(())
    }

    pub(crate) async fn close(&mut self) -> FsResult<()> {
        match self.status {
            WriterStatus::Closed => return Ok(()),
            WriterStatus::Poisoned => return Err(self.closed_error()),
            WriterStatus::Open => {}
        }

        let result = self.finish().await;
        match &result {
            Ok(()) => {
                self.status = WriterStatus::Closed;
                self.lock.take();
                debug!(
                    path = %self.path,
                    bytes = self.stats.bytes_written,
                    parts = self.stats.parts_uploaded,
                    "writer closed"
                );
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "writer failed to close");
                self.poison();
            }
        }
        result
    }

    async fn finish(&mut self) -> FsResult<()> {
        let pending = self.spill.as_ref().map_or(0, |s| s.len);
        if pending > 0 || self.parts.is_empty() {
            self.upload_part().await?;
        }
        self.spill = None;
        self.coordinator.complete(&self.upload, &self.parts).await?;
        Ok(())
    }

    fn spill_file(&mut self) -> FsResult<&mut SpillFile> {
        let spill = match self.spill.take() {
            Some(spill) => spill,
            None => SpillFile::create(&self.spill_dir)?,
        };
        Ok(self.spill.insert(spill))
    }

    /// Stop accepting writes and release the lock. Staged parts stay behind.
    fn poison(&mut self) {
        if self.status == WriterStatus::Open {
            warn!(
                path = %self.path,
                staging = %self.upload.staging,
                "writer poisoned, staged parts left in place"
            );
        }
        self.status = WriterStatus::Poisoned;
        self.spill = None;
        self.lock.take();
    }

    fn ensure_open(&self) -> FsResult<()> {
        match self.status {
            WriterStatus::Open => Ok(()),
            _ => Err(self.closed_error()),
        }
    }

    fn closed_error(&self) -> FsError {
        FsError::Closed {
            what: format!("writer for {}", self.path),
        }
    }

    pub(crate) fn path(&self) -> &FsPath {
        &self.path
    }
}

/// Write handle for a file being created.
///
/// Bytes go to a local spill file until a full part has accumulated, which is
/// then uploaded to the staging directory. [`close`](Self::close) uploads the
/// final part and composes the destination. Nothing is visible at the
/// destination before `close` succeeds.
///
/// A live writer stays registered with its file system so
/// [`shutdown`](crate::BucketFileSystem::shutdown) can close it. Dropping a
/// writer without `close` abandons it: nothing is published, the lock is
/// released and staged parts are left in place.
#[derive(Debug)]
pub struct SpillingWriter {
    state: Arc<Mutex<WriterState>>,
    id: u64,
    registry: Arc<StreamRegistry>,
    path: FsPath,
}

impl SpillingWriter {
    pub(crate) async fn create(
        coordinator: MultipartUploadCoordinator,
        registry: Arc<StreamRegistry>,
        path: FsPath,
        spill_dir: PathBuf,
        part_size: usize,
        lock: PrefixLock,
    ) -> FsResult<Self> {
        let upload = coordinator.initialize(&path).await?;
        let spill = SpillFile::create(&spill_dir)?;
        let state = Arc::new(Mutex::new(WriterState {
            path: path.clone(),
            coordinator,
            upload,
            spill_dir,
            part_size: part_size.max(1),
            spill: Some(spill),
            parts: Vec::new(),
            next_part: 1,
            stats: WriterStats::default(),
            lock: Some(lock),
            status: WriterStatus::Open,
        }));
        let id = registry.register(Arc::clone(&state));
        debug!(path = %path, part_size, "writer opened");
        Ok(Self {
            state,
            id,
            registry,
            path,
        })
    }

    /// The file being written.
    #[must_use]
    pub fn path(&self) -> &FsPath {
        &self.path
    }

    /// Append all of `buf`.
    ///
    /// May upload one or more full parts. A failed upload poisons the writer:
    /// this and every later call fail.
    pub async fn write(&mut self, buf: &[u8]) -> FsResult<()> {
        let result = self.state.lock().await.write(buf).await;
        if result.is_err() {
            self.registry.deregister(self.id);
        }
        result
    }

    /// Flush the local spill file.
    pub async fn flush(&mut self) -> FsResult<()> {
        self.state.lock().await.flush().await
    }

    /// Upload the final part and publish the file. Closing twice is a no-op.
    pub async fn close(&mut self) -> FsResult<()> {
        let result = self.state.lock().await.close().await;
        self.registry.deregister(self.id);
        result
    }

    /// Counters for this writer.
    pub async fn stats(&self) -> WriterStats {
        self.state.lock().await.stats
    }

    /// The staging upload backing this writer.
    pub async fn upload(&self) -> UploadHandle {
        self.state.lock().await.upload.clone()
    }
}

impl Drop for SpillingWriter {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
        // A held state lock means shutdown is closing this writer.
        if let Ok(mut state) = self.state.try_lock() {
            if state.status == WriterStatus::Open {
                state.poison();
            }
        }
    }
}
