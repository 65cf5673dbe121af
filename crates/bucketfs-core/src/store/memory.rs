//! In-memory object store.
//!
//! Objects live in a [`BTreeMap`] so listings come back in key order, the way
//! S3 returns them. Listing pages are capped at [`MemoryObjectStore::page_size`]
//! entries to exercise continuation handling.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::{ListPage, ObjectMeta, ObjectStore, StoreResult};
use crate::error::StoreError;

/// Maximum number of entries per listing page, matching S3's default.
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn meta(&self, key: &str) -> ObjectMeta {
        ObjectMeta {
            key: key.to_owned(),
            size: self.data.len() as u64,
            last_modified: Some(self.last_modified),
        }
    }
}

/// Thread-safe in-memory [`ObjectStore`].
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use bucketfs_core::store::{MemoryObjectStore, ObjectStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryObjectStore::new();
/// store.put("a/b", Bytes::from("hello")).await.unwrap();
/// let data = store.get_range("a/b", 1, 3).await.unwrap();
/// assert_eq!(data.as_ref(), b"ell");
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    page_size: usize,
    /// Remaining successful puts before every put fails. `None` disables.
    puts_until_failure: Mutex<Option<usize>>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store returning at most `page_size` entries per page.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            puts_until_failure: Mutex::new(None),
        }
    }

    /// Maximum number of entries per listing page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Let the next `n` puts succeed, then fail every put after them.
    pub fn fail_puts_after(&self, n: usize) {
        *self.puts_until_failure.lock() = Some(n);
    }

    /// Disable put failure injection.
    pub fn clear_failures(&self) {
        *self.puts_until_failure.lock() = None;
    }

    /// Snapshot of every key, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_put(&self, key: &str) -> StoreResult<()> {
        let mut remaining = self.puts_until_failure.lock();
        match remaining.as_mut() {
            Some(0) => Err(StoreError::Backend(anyhow::anyhow!(
                "injected put failure for {key}"
            ))),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn insert(&self, key: &str, data: Bytes) {
        trace!(key, size = data.len(), "stored object");
        self.objects.write().insert(
            key.to_owned(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
    }

    fn read(&self, key: &str) -> StoreResult<Bytes> {
        self.objects
            .read()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_owned(),
            })
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn stat(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        Ok(self.objects.read().get(key).map(|o| o.meta(key)))
    }

    async fn get_range(&self, key: &str, offset: u64, len: u64) -> StoreResult<Bytes> {
        let data = self.read(key)?;
        let size = data.len() as u64;
        if offset > size {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "range start {offset} beyond size {size} of {key}"
            )));
        }
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = usize::try_from(offset.saturating_add(len))
            .unwrap_or(usize::MAX)
            .min(data.len());
        Ok(data.slice(start..end))
    }

    async fn put(&self, key: &str, data: Bytes) -> StoreResult<()> {
        self.check_put(key)?;
        self.insert(key, data);
        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        recursive: bool,
        continuation: Option<String>,
    ) -> StoreResult<ListPage> {
        let objects = self.objects.read();
        let start = match continuation.as_deref() {
            Some(token) => Bound::Excluded(token.to_owned()),
            None => Bound::Included(prefix.to_owned()),
        };

        let mut entries: Vec<ObjectMeta> = Vec::new();
        let mut truncated = false;

        for (key, object) in objects.range((start, Bound::Unbounded)) {
            if !key.starts_with(prefix) {
                break;
            }
            // A common prefix already reported on an earlier page.
            if let Some(token) = continuation.as_deref() {
                if !recursive
                    && token.len() > prefix.len()
                    && token.ends_with('/')
                    && key.starts_with(token)
                {
                    continue;
                }
            }

            let entry = if recursive {
                object.meta(key)
            } else {
                match key[prefix.len()..].find('/') {
                    Some(pos) => {
                        let common = &key[..prefix.len() + pos + 1];
                        if common == key {
                            object.meta(key)
                        } else if entries.last().is_some_and(|e| e.key == common) {
                            continue;
                        } else {
                            ObjectMeta::prefix(common)
                        }
                    }
                    None => object.meta(key),
                }
            };

            if entries.last().is_some_and(|e| e.key == entry.key) {
                continue;
            }
            if entries.len() >= self.page_size {
                truncated = true;
                break;
            }
            entries.push(entry);
        }

        let continuation = if truncated {
            entries.last().map(|e| e.key.clone())
        } else {
            None
        };

        trace!(
            prefix,
            recursive,
            count = entries.len(),
            truncated,
            "listed objects"
        );
        Ok(ListPage {
            entries,
            continuation,
        })
    }

    async fn copy(&self, src: &str, dst: &str) -> StoreResult<()> {
        let data = self.read(src)?;
        self.check_put(dst)?;
        self.insert(dst, data);
        Ok(())
    }

    async fn compose(&self, dst: &str, sources: &[String]) -> StoreResult<()> {
        let mut combined = BytesMut::new();
        for source in sources {
            combined.extend_from_slice(&self.read(source)?);
        }
        self.check_put(dst)?;
        self.insert(dst, combined.freeze());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if self.objects.write().remove(key).is_some() {
            trace!(key, "deleted object");
        }
        Ok(())
    }
}
