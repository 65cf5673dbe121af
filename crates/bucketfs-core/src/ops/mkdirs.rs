//! Directory creation.

use bytes::Bytes;
use tracing::debug;

use super::DirectoryModel;
use crate::error::{FsError, FsResult};
use crate::path::FsPath;

impl DirectoryModel {
    /// Create `path` and every missing ancestor as directory markers.
    ///
    /// Succeeds without writing when every marker already exists. Fails with
    /// [`FsError::NotADirectory`] if any component is a file.
    pub async fn mkdirs(&self, path: &FsPath) -> FsResult<()> {
        let mut created = 0_usize;
        for dir in path.ancestors().into_iter().rev() {
            let file_key = self.mapper.key_for(&dir, false);
            if self.store.stat(&file_key).await?.is_some() {
                return Err(FsError::NotADirectory {
                    path: dir.to_string(),
                });
            }
            let marker = self.mapper.key_for(&dir, true);
            if self.store.stat(&marker).await?.is_none() {
                self.store.put(&marker, Bytes::new()).await?;
                created += 1;
            }
        }
        debug!(path = %path, created, "mkdirs completed");
        Ok(())
    }
}
