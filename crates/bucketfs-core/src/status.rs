//! File status synthesis.
//!
//! Object stores know nothing about owners, permissions or directories, so
//! every [`FileStatus`] is built here from a stat response plus constants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{FsError, FsResult};
use crate::path::{FsPath, PathKeyMapper};
use crate::store::{ObjectMeta, ObjectStore};

/// Owner and group reported for every entry.
pub const SYNTHETIC_OWNER: &str = "adapter";

/// Permission bits reported for directories.
pub const DIR_PERMISSION: u32 = 0o755;

/// Permission bits reported for files.
pub const FILE_PERMISSION: u32 = 0o644;

/// Metadata of one file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    /// The absolute path.
    pub path: FsPath,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Length in bytes; always zero for directories.
    pub len: u64,
    /// Last modification time.
    pub modification_time: DateTime<Utc>,
    /// Last access time; object stores do not track it, so this mirrors
    /// `modification_time`.
    pub access_time: DateTime<Utc>,
    /// Synthesized owner.
    pub owner: String,
    /// Synthesized group.
    pub group: String,
    /// Synthesized permission bits.
    pub permission: u32,
}

impl FileStatus {
    /// Whether the entry is a regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// Build the status of `path` from the object backing it.
#[must_use]
pub fn status_for(path: FsPath, meta: &ObjectMeta, is_dir: bool) -> FileStatus {
    let time = meta.last_modified.unwrap_or_else(Utc::now);
    FileStatus {
        path,
        is_dir,
        len: if is_dir { 0 } else { meta.size },
        modification_time: time,
        access_time: time,
        owner: SYNTHETIC_OWNER.to_owned(),
        group: SYNTHETIC_OWNER.to_owned(),
        permission: if is_dir { DIR_PERMISSION } else { FILE_PERMISSION },
    }
}

/// The synthesized status of the root directory.
#[must_use]
pub fn root_status(path: FsPath) -> FileStatus {
    status_for(path, &ObjectMeta::prefix(String::new()), true)
}

/// Stat `path` against the store.
///
/// Probes the file key first, then the directory marker. Both existing is
/// reported as [`FsError::AmbiguousPath`].
pub async fn stat(
    store: &dyn ObjectStore,
    mapper: &PathKeyMapper,
    path: &FsPath,
) -> FsResult<FileStatus> {
    if path.is_root() {
        return Ok(root_status(path.clone()));
    }

    let file_key = mapper.key_for(path, false);
    let marker_key = mapper.key_for(path, true);
    trace!(key = %file_key, "probing file key");

    match store.stat(&file_key).await? {
        Some(meta) => {
            if store.stat(&marker_key).await?.is_some() {
                return Err(FsError::AmbiguousPath {
                    path: path.to_string(),
                });
            }
            Ok(status_for(path.clone(), &meta, false))
        }
        None => {
            trace!(key = %marker_key, "probing directory marker");
            match store.stat(&marker_key).await? {
                Some(meta) => Ok(status_for(path.clone(), &meta, true)),
                None => Err(FsError::not_found(path)),
            }
        }
    }
}
