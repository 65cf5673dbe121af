//! The object store collaborator.
//!
//! [`ObjectStore`] is the narrow set of primitives the adapter builds every
//! file system operation from: stat, ranged get, put, list-by-prefix, copy,
//! compose and single-key delete. Implementations own retries, timeouts and
//! the wire protocol; the adapter treats every error they return as final.
//!
//! [`MemoryObjectStore`] is an in-process implementation backed by a sorted
//! map. The `bucketfs-s3` crate provides one over `aws-sdk-s3`.

mod memory;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

pub use memory::MemoryObjectStore;

/// Result type for object store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata of one object, or of one common prefix in a delimited listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// The bucket-relative key.
    pub key: String,
    /// Size in bytes; zero for common prefixes.
    pub size: u64,
    /// Last modification time, when the backend reports one.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Metadata for a common prefix reported by a delimited listing.
    #[must_use]
    pub fn prefix(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            last_modified: None,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects and (for delimited listings) common prefixes, in key order.
    pub entries: Vec<ObjectMeta>,
    /// Token for the next page; `None` when the listing is complete.
    pub continuation: Option<String>,
}

/// Primitive operations of a flat, key-addressed object store.
///
/// All keys are relative to the bucket the implementation was built for.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Stat a single key. `Ok(None)` when the key does not exist.
    async fn stat(&self, key: &str) -> StoreResult<Option<ObjectMeta>>;

    /// Read up to `len` bytes starting at `offset`.
    ///
    /// May return fewer bytes than requested; returns an empty buffer when
    /// `offset` equals the object size.
    async fn get_range(&self, key: &str, offset: u64, len: u64) -> StoreResult<Bytes>;

    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Bytes) -> StoreResult<()>;

    /// Store the first `len` bytes of a local file under `key`.
    ///
    /// The default reads the file into memory and calls [`put`](Self::put).
    async fn put_file(&self, key: &str, file: &Path, len: u64) -> StoreResult<()> {
        let data = tokio::fs::read(file).await.map_err(|e| {
            StoreError::Backend(anyhow::anyhow!(
                "failed to read local file {}: {e}",
                file.display()
            ))
        })?;
        let len = usize::try_from(len).unwrap_or(usize::MAX).min(data.len());
        self.put(key, Bytes::from(data).slice(..len)).await
    }

    /// List keys starting with `prefix`.
    ///
    /// When `recursive` is false the listing is delimited by `/`: keys below
    /// the next `/` collapse into one common-prefix entry ending in `/`.
    async fn list(
        &self,
        prefix: &str,
        recursive: bool,
        continuation: Option<String>,
    ) -> StoreResult<ListPage>;

    /// Server-side copy of `src` to `dst`.
    async fn copy(&self, src: &str, dst: &str) -> StoreResult<()>;

    /// Server-side concatenation of `sources`, in order, into `dst`.
    async fn compose(&self, dst: &str, sources: &[String]) -> StoreResult<()>;

    /// Delete a single key. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}
