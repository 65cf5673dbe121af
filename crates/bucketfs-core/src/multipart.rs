//! Multipart upload lifecycle.
//!
//! Parts are staged as ordinary objects under a per-upload directory and
//! composed into the destination on completion:
//!
//! ```text
//! /.tmp-parts/<id>/part-1
//! /.tmp-parts/<id>/part-2      --compose-->  /dest/file
//! ...
//! ```
//!
//! An upload that never completes leaves its staging directory behind.
//! There is no abort; orphaned staging directories must be removed by hand.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{FsError, FsResult};
use crate::ops::DirectoryModel;
use crate::path::FsPath;

/// Directory under which every upload stages its parts.
pub const STAGING_ROOT: &str = "/.tmp-parts";

/// An in-progress upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHandle {
    /// Unique upload id.
    pub id: String,
    /// Final destination.
    pub dest: FsPath,
    /// Directory holding the staged parts.
    pub staging: FsPath,
}

/// One uploaded part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartHandle {
    /// 1-based part number.
    pub part_number: u32,
    /// Where the part is staged.
    pub path: FsPath,
}

/// A completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathHandle {
    /// The finalized file.
    pub path: FsPath,
}

/// Any multipart handle, in a form that can be persisted.
///
/// # Examples
///
/// ```
/// use bucketfs_core::multipart::{MultipartHandle, PathHandle};
/// use bucketfs_core::path::FsPath;
///
/// let handle = MultipartHandle::Path(PathHandle {
///     path: FsPath::new("/done").unwrap(),
/// });
/// let bytes = handle.to_bytes().unwrap();
/// assert_eq!(MultipartHandle::from_bytes(&bytes).unwrap(), handle);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MultipartHandle {
    /// An upload handle.
    Upload(UploadHandle),
    /// A part handle.
    Part(PartHandle),
    /// A finalized path.
    Path(PathHandle),
}

impl MultipartHandle {
    /// Encode as opaque bytes.
    pub fn to_bytes(&self) -> FsResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> FsResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<UploadHandle> for MultipartHandle {
    fn from(handle: UploadHandle) -> Self {
        Self::Upload(handle)
    }
}

impl From<PartHandle> for MultipartHandle {
    fn from(handle: PartHandle) -> Self {
        Self::Part(handle)
    }
}

impl From<PathHandle> for MultipartHandle {
    fn from(handle: PathHandle) -> Self {
        Self::Path(handle)
    }
}

/// Drives uploads through initialize, put part and complete.
#[derive(Debug, Clone)]
pub struct MultipartUploadCoordinator {
    model: DirectoryModel,
}

impl MultipartUploadCoordinator {
    /// Create a coordinator staging through `model`.
    #[must_use]
    pub fn new(model: DirectoryModel) -> Self {
        Self { model }
    }

    /// Start an upload to `dest` with a fresh staging directory.
    pub async fn initialize(&self, dest: &FsPath) -> FsResult<UploadHandle> {
        let id = Uuid::new_v4().simple().to_string();
        let staging = FsPath::root().join(STAGING_ROOT).join(&id);
        self.model.mkdirs(&staging).await?;
        debug!(dest = %dest, staging = %staging, "multipart upload initialized");
        Ok(UploadHandle {
            id,
            dest: dest.clone(),
            staging,
        })
    }

    /// Upload the first `len` bytes of `file` as part `part_number`.
    pub async fn put_part(
        &self,
        upload: &UploadHandle,
        part_number: u32,
        file: &Path,
        len: u64,
    ) -> FsResult<PartHandle> {
        let path = upload.staging.join(&format!("part-{part_number}"));
        let key = self.model.mapper().key_for(&path, false);
        self.model.store().put_file(&key, file, len).await?;
        debug!(dest = %upload.dest, part_number, len, "part uploaded");
        Ok(PartHandle { part_number, path })
    }

    /// Compose `parts` into the destination and drop the staging directory.
    ///
    /// Parts may be given in any order but must be numbered `1..=N` with no
    /// gaps; otherwise [`FsError::MissingPart`] names the first gap.
    pub async fn complete(
        &self,
        upload: &UploadHandle,
        parts: &[PartHandle],
    ) -> FsResult<PathHandle> {
        let mut ordered: Vec<&PartHandle> = parts.iter().collect();
        ordered.sort_by_key(|p| p.part_number);
        ordered.dedup_by_key(|p| p.part_number);

        let gap = ordered
            .iter()
            .zip(1_u32..)
            .find(|(part, expected)| part.part_number != *expected)
            .map(|(_, expected)| expected);
        if let Some(part_number) = gap.or(ordered.is_empty().then_some(1)) {
            return Err(FsError::MissingPart {
                path: upload.dest.to_string(),
                part_number,
            });
        }

        let mapper = self.model.mapper();
        let sources: Vec<String> = ordered
            .iter()
            .map(|p| mapper.key_for(&p.path, false))
            .collect();
        let dest_key = mapper.key_for(&upload.dest, false);
        self.model.store().compose(&dest_key, &sources).await?;
        self.model.delete(&upload.staging, true).await?;

        debug!(dest = %upload.dest, parts = sources.len(), "multipart upload completed");
        Ok(PathHandle {
            path: upload.dest.clone(),
        })
    }

    /// Not supported: staged parts stay until removed by hand.
    #[allow(clippy::unused_async)]
    pub async fn abort(&self, upload: &UploadHandle) -> FsResult<()> {
        Err(FsError::Unsupported {
            operation: format!("abort multipart upload to {}", upload.dest),
        })
    }
}
