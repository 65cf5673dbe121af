//! Deletion of files, directories and dangling subtrees.

use tracing::debug;

use super::DirectoryModel;
use crate::error::{FsError, FsResult};
use crate::path::FsPath;

impl DirectoryModel {
    /// Delete `path`. Returns whether anything was removed.
    ///
    /// A missing path is not an error. A non-empty directory requires
    /// `recursive`, otherwise [`FsError::DirectoryNotEmpty`]. Keys left under
    /// a prefix with no marker and no file object are swept the same way.
    pub async fn delete(&self, path: &FsPath, recursive: bool) -> FsResult<bool> {
        if path.is_root() {
            return self.delete_children(path, recursive).await;
        }

        let removed = match self.try_stat(path).await? {
            Some(status) if !status.is_dir => {
                self.store
                    .delete(&self.mapper.key_for(path, false))
                    .await?;
                true
            }
            Some(_) => {
                self.delete_children(path, recursive).await?;
                self.store.delete(&self.mapper.key_for(path, true)).await?;
                true
            }
            None => self.delete_children(path, recursive).await?,
        };
        debug!(path = %path, recursive, removed, "delete completed");
        Ok(removed)
    }

    /// Remove every key below `path`'s prefix, deepest first.
    async fn delete_children(&self, path: &FsPath, recursive: bool) -> FsResult<bool> {
        let prefix = self.mapper.prefix_for(path);
        let direct = self.list_keys(&prefix, false).await?;
        if direct.is_empty() {
            return Ok(false);
        }
        if !recursive {
            return Err(FsError::DirectoryNotEmpty {
                path: path.to_string(),
            });
        }

        let mut keys: Vec<String> = self
            .list_keys(&prefix, true)
            .await?
            .into_iter()
            .map(|meta| meta.key)
            .collect();
        // Reverse key order puts every descendant before its directory marker.
        keys.sort_unstable_by(|a, b| b.cmp(a));
        for key in &keys {
            self.store.delete(key).await?;
        }
        Ok(!keys.is_empty())
    }
}
