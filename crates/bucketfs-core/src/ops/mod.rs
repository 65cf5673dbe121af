//! Directory operations over a flat key space.
//!
//! [`DirectoryModel`] emulates directories with zero-byte marker objects
//! whose keys end in `/`. It is stateless: every call recomputes from what the
//! store holds right now. Submodules add the operations as `impl` blocks:
//!
//! - [`mkdirs`] creates missing markers top-down.
//! - [`list`] lists direct children or a whole subtree.
//! - [`delete`] removes files, directories and dangling subtrees.
//! - [`rename`] copies a subtree key by key and deletes the source.
//!
//! None of these take prefix locks. Callers that need coordination acquire
//! locks first, so composite operations can call each other freely.

pub mod delete;
pub mod list;
pub mod mkdirs;
pub mod rename;

use std::sync::Arc;

use tracing::trace;

use crate::error::{FsError, FsResult};
use crate::path::{FsPath, PathKeyMapper};
use crate::status::{self, FileStatus};
use crate::store::{ObjectMeta, ObjectStore};

/// Directory emulation over an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct DirectoryModel {
    store: Arc<dyn ObjectStore>,
    mapper: PathKeyMapper,
}

impl DirectoryModel {
    /// Create a model over `store`, mapping paths with `mapper`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, mapper: PathKeyMapper) -> Self {
        Self { store, mapper }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// The path mapper.
    #[must_use]
    pub fn mapper(&self) -> &PathKeyMapper {
        &self.mapper
    }

    /// Stat `path`.
    pub async fn stat(&self, path: &FsPath) -> FsResult<FileStatus> {
        status::stat(self.store.as_ref(), &self.mapper, path).await
    }

    /// Stat `path`, mapping [`FsError::NotFound`] to `None`.
    pub async fn try_stat(&self, path: &FsPath) -> FsResult<Option<FileStatus>> {
        match self.stat(path).await {
            Ok(status) => Ok(Some(status)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fail unless `path` exists and is a directory.
    pub async fn require_dir(&self, path: &FsPath) -> FsResult<()> {
        let status = self.stat(path).await?;
        if status.is_dir {
            Ok(())
        } else {
            Err(FsError::NotADirectory {
                path: path.to_string(),
            })
        }
    }

    /// Every entry under `prefix`, following continuation tokens.
    pub(crate) async fn list_keys(
        &self,
        prefix: &str,
        recursive: bool,
    ) -> FsResult<Vec<ObjectMeta>> {
        let mut out = Vec::new();
        let mut continuation = None;
        loop {
            let page = self.store.list(prefix, recursive, continuation).await?;
            trace!(prefix, count = page.entries.len(), "listed page");
            out.extend(page.entries.into_iter().filter(|e| e.key != prefix));
            match page.continuation {
                Some(token) => continuation = Some(token),
                None => return Ok(out),
            }
        }
    }
}
