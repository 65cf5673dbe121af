//! Buffered random-access reads.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{FsError, FsResult};
use crate::lock::PrefixLock;
use crate::path::FsPath;
use crate::store::ObjectStore;

/// Reads one object through a fixed-size buffer.
///
/// The object length is captured at open. Seeks inside the buffered window
/// only move the cursor; anything else triggers a ranged GET of up to
/// `buffer_size` bytes from the new position.
///
/// Holds the path's prefix lock until [`close`](Self::close) or drop.
#[derive(Debug)]
pub struct RangedReader {
    store: Arc<dyn ObjectStore>,
    path: FsPath,
    key: String,
    len: u64,
    position: u64,
    buffer: Bytes,
    buffer_start: u64,
    buffer_size: usize,
    lock: Option<PrefixLock>,
    closed: bool,
}

impl RangedReader {
    pub(crate) fn new(
        store: Arc<dyn ObjectStore>,
        path: FsPath,
        key: String,
        len: u64,
        buffer_size: usize,
        lock: PrefixLock,
    ) -> Self {
        debug!(path = %path, len, "reader opened");
        Self {
            store,
            path,
            key,
            len,
            position: 0,
            buffer: Bytes::new(),
            buffer_start: 0,
            buffer_size: buffer_size.max(1),
            lock: Some(lock),
            closed: false,
        }
    }

    /// The file being read.
    #[must_use]
    pub fn path(&self) -> &FsPath {
        &self.path
    }

    /// Length of the file at open.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current read position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left between the position and the end of the file.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.len - self.position
    }

    /// Move the read position to `pos`.
    ///
    /// `pos` may equal the length; anything beyond fails with
    /// [`FsError::InvalidSeek`].
    pub async fn seek(&mut self, pos: u64) -> FsResult<()> {
        self.ensure_open()?;
        if pos > self.len {
            return Err(FsError::InvalidSeek {
                path: self.path.to_string(),
                position: pos,
                len: self.len,
            });
        }
        self.position = pos;
        if !self.in_buffer(pos) {
            self.fill().await?;
        }
        Ok(())
    }

    /// Read into `dst` until it is full or the file ends.
    ///
    /// Returns the number of bytes read; `0` for a non-empty `dst` means end
    /// of file.
    pub async fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        self.ensure_open()?;
        let mut written = 0;
        while written < dst.len() && self.position < self.len {
            if !self.in_buffer(self.position) || self.buffered_remaining() == 0 {
                self.fill().await?;
                continue;
            }
            let offset = self.buffer_offset();
            let n = (dst.len() - written).min(self.buffered_remaining());
            dst[written..written + n].copy_from_slice(&self.buffer[offset..offset + n]);
            written += n;
            self.position += n as u64;
        }
        Ok(written)
    }

    /// Read one byte, or `None` at end of file.
    pub async fn read_byte(&mut self) -> FsResult<Option<u8>> {
        let mut byte = [0_u8; 1];
        match self.read(&mut byte).await? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Read everything from the position to the end, appending to `dst`.
    pub async fn read_to_end(&mut self, dst: &mut Vec<u8>) -> FsResult<usize> {
        let start = dst.len();
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        dst.resize(start + remaining, 0);
        let n = self.read(&mut dst[start..]).await?;
        dst.truncate(start + n);
        Ok(n)
    }

    /// Release the lock and the buffer. Later reads fail with
    /// [`FsError::Closed`]. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.buffer = Bytes::new();
        if let Some(lock) = self.lock.take() {
            lock.release();
        }
        debug!(path = %self.path, "reader closed");
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> FsResult<()> {
        if self.closed {
            return Err(FsError::Closed {
                what: format!("reader for {}", self.path),
            });
        }
        Ok(())
    }

    fn in_buffer(&self, pos: u64) -> bool {
        pos >= self.buffer_start && pos <= self.buffer_start + self.buffer.len() as u64
    }

    #[allow(clippy::cast_possible_truncation)]
    fn buffer_offset(&self) -> usize {
        (self.position - self.buffer_start) as usize
    }

    fn buffered_remaining(&self) -> usize {
        self.buffer.len() - self.buffer_offset()
    }

    async fn fill(&mut self) -> FsResult<()> {
        let want = (self.len - self.position).min(self.buffer_size as u64);
        let data = self.store.get_range(&self.key, self.position, want).await?;
        trace!(
            key = %self.key,
            offset = self.position,
            requested = want,
            received = data.len(),
            "buffer refilled"
        );
        if data.is_empty() && want > 0 {
            return Err(FsError::UnexpectedEof {
                path: self.path.to_string(),
                position: self.position,
                len: self.len,
            });
        }
        self.buffer = data;
        self.buffer_start = self.position;
        Ok(())
    }
}
