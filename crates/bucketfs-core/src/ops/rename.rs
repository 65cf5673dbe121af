//! Rename by copy and delete.
//!
//! Not atomic. A failure part-way leaves the keys copied so far under the
//! destination and the source untouched; the caller sees the error and both
//! trees may be populated.

use tracing::debug;

use super::DirectoryModel;
use crate::error::{FsError, FsResult};
use crate::path::FsPath;

impl DirectoryModel {
    /// Move `src` to `dst`.
    ///
    /// Fails with [`FsError::NotFound`] for a missing source,
    /// [`FsError::AlreadyExists`] for an existing destination and
    /// [`FsError::InvalidPath`] when moving a directory into itself.
    pub async fn rename(&self, src: &FsPath, dst: &FsPath) -> FsResult<()> {
        let status = self.stat(src).await?;
        if src == dst {
            return Ok(());
        }
        if src.is_root() {
            return Err(FsError::invalid_path(src, "cannot rename the root"));
        }
        if status.is_dir && dst.is_within(src) {
            return Err(FsError::invalid_path(
                dst,
                format!("cannot move directory {src} into itself"),
            ));
        }
        if self.try_stat(dst).await?.is_some() {
            return Err(FsError::AlreadyExists {
                path: dst.to_string(),
            });
        }
        if let Some(parent) = dst.parent() {
            self.mkdirs(&parent).await?;
        }

        let mut copied = 1_usize;
        self.store
            .copy(
                &self.mapper.key_for(src, status.is_dir),
                &self.mapper.key_for(dst, status.is_dir),
            )
            .await?;

        if status.is_dir {
            let src_prefix = self.mapper.prefix_for(src);
            let dst_prefix = self.mapper.prefix_for(dst);
            for meta in self.list_keys(&src_prefix, true).await? {
                let Some(suffix) = meta.key.strip_prefix(&src_prefix) else {
                    continue;
                };
                let target = format!("{dst_prefix}{suffix}");
                self.store.copy(&meta.key, &target).await?;
                copied += 1;
            }
        }

        self.delete(src, true).await?;
        debug!(src = %src, dst = %dst, copied, "rename completed");
        Ok(())
    }
}
