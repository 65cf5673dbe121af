//! Directory listing.

use tracing::debug;

use super::DirectoryModel;
use crate::error::FsResult;
use crate::path::{FsPath, PathKeyMapper};
use crate::status::{self, FileStatus};

impl DirectoryModel {
    /// List `path`.
    ///
    /// A file lists as itself. A directory lists its direct children, or its
    /// whole subtree when `recursive` is set. The directory's own marker is
    /// never included. Missing paths fail with
    /// [`FsError::NotFound`](crate::error::FsError::NotFound).
    pub async fn list(&self, path: &FsPath, recursive: bool) -> FsResult<Vec<FileStatus>> {
        let status = self.stat(path).await?;
        if !status.is_dir {
            return Ok(vec![status]);
        }

        let prefix = self.mapper.prefix_for(path);
        let entries = self.list_keys(&prefix, recursive).await?;
        let mut out = Vec::with_capacity(entries.len());
        for meta in &entries {
            let is_dir = PathKeyMapper::is_dir_key(&meta.key);
            let child = self.mapper.path_for(&meta.key)?;
            out.push(status::status_for(child, meta, is_dir));
        }
        debug!(path = %path, recursive, count = out.len(), "list completed");
        Ok(out)
    }
}
