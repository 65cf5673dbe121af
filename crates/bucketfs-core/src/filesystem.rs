//! The file system facade.
//!
//! [`BucketFileSystem`] owns everything with a lifetime: the working
//! directory, the prefix lock table and the registry of open writers. Path
//! arguments may be absolute, relative to the working directory, or
//! qualified as `scheme://bucket/path`.
//!
//! # Locking
//!
//! Readers, writers, `mkdirs`, `delete` and `rename` take the prefix lock of
//! every path they touch before doing any work. `list_status` and
//! `get_status` do not lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::config::FsConfig;
use crate::error::{FsError, FsResult};
use crate::io::{RangedReader, SpillingWriter, StreamRegistry};
use crate::lock::PrefixLockTable;
use crate::multipart::MultipartUploadCoordinator;
use crate::ops::DirectoryModel;
use crate::path::{FsPath, PathKeyMapper};
use crate::status::FileStatus;
use crate::store::ObjectStore;

/// Options for [`BucketFileSystem::create`].
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct CreateOptions {
    /// Replace an existing file instead of failing.
    #[builder(default)]
    pub overwrite: bool,
    /// Part size for this file, overriding the configured default.
    #[builder(default, setter(strip_option))]
    pub part_size: Option<usize>,
}

impl CreateOptions {
    /// Options that replace an existing file.
    #[must_use]
    pub fn overwrite() -> Self {
        Self::builder().overwrite(true).build()
    }
}

/// Hierarchical file system over an [`ObjectStore`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use bucketfs_core::{BucketFileSystem, CreateOptions, FsConfig};
/// use bucketfs_core::store::MemoryObjectStore;
///
/// # tokio_test::block_on(async {
/// let config = FsConfig::builder().bucket("warehouse".into()).build();
/// let fs = BucketFileSystem::new(config, Arc::new(MemoryObjectStore::new())).unwrap();
///
/// let mut writer = fs.create("/t1/data", CreateOptions::default()).await.unwrap();
/// writer.write(b"hello").await.unwrap();
/// writer.close().await.unwrap();
///
/// let mut reader = fs.open("/t1/data").await.unwrap();
/// let mut out = Vec::new();
/// reader.read_to_end(&mut out).await.unwrap();
/// assert_eq!(out, b"hello");
/// # });
/// ```
#[derive(Debug)]
pub struct BucketFileSystem {
    config: FsConfig,
    model: DirectoryModel,
    coordinator: MultipartUploadCoordinator,
    locks: Arc<PrefixLockTable>,
    streams: Arc<StreamRegistry>,
    working_dir: RwLock<FsPath>,
    closed: AtomicBool,
}

impl BucketFileSystem {
    /// Create a file system over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Config`] if `config` fails validation.
    pub fn new(config: FsConfig, store: Arc<dyn ObjectStore>) -> FsResult<Self> {
        config.validate()?;
        let mapper = PathKeyMapper::from_config(&config);
        let model = DirectoryModel::new(store, mapper);
        let locks = Arc::new(PrefixLockTable::new(
            config.lock_poll_interval(),
            config.lock_timeout(),
        ));
        info!(
            bucket = %config.bucket,
            root_prefix = %model.mapper().root_prefix(),
            "file system initialized"
        );
        Ok(Self {
            coordinator: MultipartUploadCoordinator::new(model.clone()),
            model,
            locks,
            streams: Arc::new(StreamRegistry::default()),
            working_dir: RwLock::new(FsPath::root()),
            closed: AtomicBool::new(false),
            config,
        })
    }

    /// The configuration this file system was built with.
    #[must_use]
    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// The path mapper.
    #[must_use]
    pub fn mapper(&self) -> &PathKeyMapper {
        self.model.mapper()
    }

    /// The shared prefix lock table.
    #[must_use]
    pub fn lock_table(&self) -> &Arc<PrefixLockTable> {
        &self.locks
    }

    /// The root of this file system as a qualified URI.
    #[must_use]
    pub fn uri(&self) -> String {
        self.mapper().qualify(&FsPath::root())
    }

    /// Block size reported to callers; equal to the read buffer size.
    #[must_use]
    pub fn default_block_size(&self) -> u64 {
        self.config.read_buffer_size as u64
    }

    /// Default multipart part size.
    #[must_use]
    pub fn default_part_size(&self) -> usize {
        self.config.part_size
    }

    /// The directory relative paths resolve against.
    #[must_use]
    pub fn working_directory(&self) -> FsPath {
        self.working_dir.read().clone()
    }

    /// Change the working directory. Relative input resolves against the
    /// current one.
    pub fn set_working_directory(&self, raw: &str) -> FsResult<()> {
        let path = self.resolve(raw)?;
        *self.working_dir.write() = path;
        Ok(())
    }

    /// Number of writers created but not yet closed.
    #[must_use]
    pub fn open_writers(&self) -> usize {
        self.streams.len()
    }

    /// Open `raw` for reading.
    ///
    /// Waits for any conflicting lock holder. Fails with
    /// [`FsError::NotAFile`] for a directory.
    pub async fn open(&self, raw: &str) -> FsResult<RangedReader> {
        self.ensure_open()?;
        let path = self.resolve(raw)?;
        let lock = self.locks.acquire(&self.mapper().lock_key_for(&path)).await?;
        let status = self.model.stat(&path).await?;
        if status.is_dir {
            return Err(FsError::NotAFile {
                path: path.to_string(),
            });
        }
        let key = self.mapper().key_for(&path, false);
        Ok(RangedReader::new(
            Arc::clone(self.model.store()),
            path,
            key,
            status.len,
            self.config.read_buffer_size,
            lock,
        ))
    }

    /// Create `raw` for writing, creating missing parent directories.
    pub async fn create(&self, raw: &str, options: CreateOptions) -> FsResult<SpillingWriter> {
        self.create_file(raw, options, true).await
    }

    /// Create `raw` for writing. The parent must already be a directory.
    pub async fn create_non_recursive(
        &self,
        raw: &str,
        options: CreateOptions,
    ) -> FsResult<SpillingWriter> {
        self.create_file(raw, options, false).await
    }

    /// Appending is not supported by object stores.
    pub fn append(&self, raw: &str) -> FsResult<SpillingWriter> {
        Err(FsError::Unsupported {
            operation: format!("append to {raw}"),
        })
    }

    /// Create `raw` and every missing ancestor as directories.
    pub async fn mkdirs(&self, raw: &str) -> FsResult<()> {
        self.ensure_open()?;
        let path = self.resolve(raw)?;
        let _lock = self.locks.acquire(&self.mapper().lock_key_for(&path)).await?;
        self.model.mkdirs(&path).await
    }

    /// Delete `raw`. Returns whether anything was removed.
    pub async fn delete(&self, raw: &str, recursive: bool) -> FsResult<bool> {
        self.ensure_open()?;
        let path = self.resolve(raw)?;
        let _lock = self.locks.acquire(&self.mapper().lock_key_for(&path)).await?;
        self.model.delete(&path, recursive).await
    }

    /// Direct children of `raw`, or `raw` itself if it is a file.
    pub async fn list_status(&self, raw: &str) -> FsResult<Vec<FileStatus>> {
        self.ensure_open()?;
        let path = self.resolve(raw)?;
        self.model.list(&path, false).await
    }

    /// Every descendant of `raw`.
    pub async fn list_status_recursive(&self, raw: &str) -> FsResult<Vec<FileStatus>> {
        self.ensure_open()?;
        let path = self.resolve(raw)?;
        self.model.list(&path, true).await
    }

    /// Move `src` to `dst`. Not atomic.
    pub async fn rename(&self, src: &str, dst: &str) -> FsResult<()> {
        self.ensure_open()?;
        let src = self.resolve(src)?;
        let dst = self.resolve(dst)?;
        let mapper = self.mapper();
        let _lock = self
            .locks
            .acquire_all(&[mapper.lock_key_for(&src), mapper.lock_key_for(&dst)])
            .await?;
        self.model.rename(&src, &dst).await
    }

    /// Status of `raw`.
    pub async fn get_status(&self, raw: &str) -> FsResult<FileStatus> {
        self.ensure_open()?;
        let path = self.resolve(raw)?;
        self.model.stat(&path).await
    }

    /// Whether `raw` exists as a file or directory.
    pub async fn exists(&self, raw: &str) -> FsResult<bool> {
        self.ensure_open()?;
        let path = self.resolve(raw)?;
        Ok(self.model.try_stat(&path).await?.is_some())
    }

    /// [`shutdown`](Self::shutdown) bounded by the configured shutdown timeout.
    pub async fn close(&self) -> FsResult<()> {
        self.shutdown(self.config.shutdown_timeout()).await
    }

    /// Close every writer still open, waiting at most `timeout`, then close
    /// the lock table. Later calls fail with [`FsError::Closed`].
    ///
    /// Writers that miss the deadline are abandoned with their staged parts.
    pub async fn shutdown(&self, timeout: Duration) -> FsResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let writers = self.streams.drain();
        let pending = writers.len();
        let closes = writers.into_iter().map(|state| async move {
            let mut state = state.lock().await;
            let result = state.close().await;
            (state.path().clone(), result)
        });

        match tokio::time::timeout(timeout, join_all(closes)).await {
            Ok(results) => {
                for (path, result) in results {
                    if let Err(e) = result {
                        warn!(path = %path, error = %e, "failed to close writer during shutdown");
                    }
                }
            }
            Err(_) => {
                warn!(
                    pending,
                    ?timeout,
                    "shutdown timed out, abandoning open writers"
                );
            }
        }

        self.locks.close();
        info!(closed_writers = pending, "file system shut down");
        Ok(())
    }

    async fn create_file(
        &self,
        raw: &str,
        options: CreateOptions,
        recursive: bool,
    ) -> FsResult<SpillingWriter> {
        self.ensure_open()?;
        let path = self.resolve(raw)?;
        let lock = self.locks.acquire(&self.mapper().lock_key_for(&path)).await?;

        match self.model.try_stat(&path).await? {
            Some(status) if status.is_dir => {
                return Err(FsError::NotAFile {
                    path: path.to_string(),
                });
            }
            Some(_) if options.overwrite => {
                self.model.delete(&path, false).await?;
            }
            Some(_) => {
                return Err(FsError::AlreadyExists {
                    path: path.to_string(),
                });
            }
            None => {}
        }

        if let Some(parent) = path.parent() {
            if recursive {
                self.model.mkdirs(&parent).await?;
            } else {
                self.model.require_dir(&parent).await?;
            }
        }

        debug!(path = %path, overwrite = options.overwrite, recursive, "creating file");
        SpillingWriter::create(
            self.coordinator.clone(),
            Arc::clone(&self.streams),
            path,
            self.config.spill_dir.clone(),
            options.part_size.unwrap_or(self.config.part_size),
            lock,
        )
        .await
    }

    fn resolve(&self, raw: &str) -> FsResult<FsPath> {
        let cwd = self.working_dir.read().clone();
        self.mapper().parse(raw, &cwd)
    }

    fn ensure_open(&self) -> FsResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(FsError::Closed {
                what: "file system".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::store::MemoryObjectStore;

    const PART: usize = 8;

    struct Fixture {
        fs: Arc<BucketFileSystem>,
        store: Arc<MemoryObjectStore>,
        _spill: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let spill = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let config = FsConfig::builder()
            .bucket("test".into())
            .root_prefix("hbase".into())
            .scheme("minio".into())
            .part_size(PART)
            .read_buffer_size(5)
            .spill_dir(spill.path().to_path_buf())
            .lock_poll_interval_ms(10)
            .build();
        let store = Arc::new(MemoryObjectStore::with_page_size(3));
        let fs = BucketFileSystem::new(config, store.clone())
            .unwrap_or_else(|e| panic!("{e}"));
        Fixture {
            fs: Arc::new(fs),
            store,
            _spill: spill,
        }
    }

    async fn write_file(fs: &BucketFileSystem, raw: &str, data: &[u8], options: CreateOptions) {
        let mut writer = fs
            .create(raw, options)
            .await
            .unwrap_or_else(|e| panic!("create {raw}: {e}"));
        writer.write(data).await.unwrap_or_else(|e| panic!("{e}"));
        writer.close().await.unwrap_or_else(|e| panic!("{e}"));
    }

    async fn read_file(fs: &BucketFileSystem, raw: &str) -> Vec<u8> {
        let mut reader = fs
            .open(raw)
            .await
            .unwrap_or_else(|e| panic!("open {raw}: {e}"));
        let mut out = Vec::new();
        reader
            .read_to_end(&mut out)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        reader.close();
        out
    }

    fn paths(statuses: &[FileStatus]) -> BTreeSet<String> {
        statuses.iter().map(|s| s.path.to_string()).collect()
    }

    #[tokio::test]
    async fn test_should_mkdirs_once() {
        let f = fixture();
        f.fs.mkdirs("/a/b").await.unwrap_or_else(|e| panic!("{e}"));
        let status = f.fs.get_status("/a/b").await.unwrap_or_else(|e| panic!("{e}"));
        assert!(status.is_dir);
        let before = f.store.keys();
        f.fs.mkdirs("/a/b").await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(f.store.keys(), before);
    }

    #[tokio::test]
    async fn test_should_round_trip_across_part_boundaries() {
        let f = fixture();
        let big: Vec<u8> = (0..9 * 1024).map(|i| (i % 251) as u8).collect();
        let cases: Vec<(&str, Vec<u8>, CreateOptions)> = vec![
            ("/rt/empty", Vec::new(), CreateOptions::default()),
            ("/rt/one-part", vec![7; PART], CreateOptions::default()),
            ("/rt/over", vec![9; PART + 1], CreateOptions::default()),
            (
                "/rt/big",
                big,
                CreateOptions::builder().part_size(8 * 1024).build(),
            ),
        ];

        for (raw, data, options) in cases {
            write_file(&f.fs, raw, &data, options).await;
            let status = f.fs.get_status(raw).await.unwrap_or_else(|e| panic!("{e}"));
            assert!(status.is_file());
            assert_eq!(status.len, data.len() as u64, "{raw}");
            assert_eq!(read_file(&f.fs, raw).await, data, "{raw}");
        }
        assert_eq!(f.fs.open_writers(), 0);
        assert!(f.fs.lock_table().held().is_empty());
    }

    #[tokio::test]
    async fn test_should_delete_missing_path() {
        let f = fixture();
        let removed = f
            .fs
            .delete("/never/existed", true)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_should_delete_directory_trees() {
        let f = fixture();
        write_file(&f.fs, "/t/a/1", b"one", CreateOptions::default()).await;
        write_file(&f.fs, "/t/b/2", b"two", CreateOptions::default()).await;

        let err = f.fs.delete("/t", false).await;
        assert!(matches!(err, Err(FsError::DirectoryNotEmpty { .. })));

        assert!(f.fs.delete("/t", true).await.unwrap_or_else(|e| panic!("{e}")));
        for raw in ["/t", "/t/a", "/t/a/1", "/t/b", "/t/b/2"] {
            assert!(matches!(
                f.fs.get_status(raw).await,
                Err(FsError::NotFound { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_should_list_children_and_descendants() {
        let f = fixture();
        write_file(&f.fs, "/l/x", b"x", CreateOptions::default()).await;
        write_file(&f.fs, "/l/d/y", b"y", CreateOptions::default()).await;
        write_file(&f.fs, "/l/d/e/z", b"z", CreateOptions::default()).await;

        let direct = f.fs.list_status("/l").await.unwrap_or_else(|e| panic!("{e}"));
        let expected: BTreeSet<String> = ["/l/x", "/l/d"].iter().map(ToString::to_string).collect();
        assert_eq!(paths(&direct), expected);

        let all = f
            .fs
            .list_status_recursive("/l")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let expected: BTreeSet<String> = ["/l/x", "/l/d", "/l/d/y", "/l/d/e", "/l/d/e/z"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(paths(&all), expected);
    }

    #[tokio::test]
    async fn test_should_rename_directory() {
        let f = fixture();
        write_file(&f.fs, "/src/a", b"a", CreateOptions::default()).await;
        write_file(&f.fs, "/src/sub/b", b"b", CreateOptions::default()).await;

        f.fs.rename("/src", "/moved/dst")
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        for (old, new) in [("/src/a", "/moved/dst/a"), ("/src/sub/b", "/moved/dst/sub/b")] {
            assert!(matches!(
                f.fs.get_status(old).await,
                Err(FsError::NotFound { .. })
            ));
            assert!(f.fs.exists(new).await.unwrap_or_else(|e| panic!("{e}")));
        }
        assert_eq!(read_file(&f.fs, "/moved/dst/sub/b").await, b"b");
        assert!(!f.fs.exists("/src").await.unwrap_or_else(|e| panic!("{e}")));
    }

    #[tokio::test]
    async fn test_should_block_writer_while_reader_open() {
        let f = fixture();
        write_file(&f.fs, "/shared", b"before", CreateOptions::default()).await;
        let mut reader = f.fs.open("/shared").await.unwrap_or_else(|e| panic!("{e}"));

        let writer = {
            let fs = Arc::clone(&f.fs);
            tokio::spawn(async move {
                let mut w = fs.create("/shared", CreateOptions::overwrite()).await?;
                w.write(b"after").await?;
                w.close().await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!writer.is_finished());
        let mut out = Vec::new();
        reader
            .read_to_end(&mut out)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, b"before");
        reader.close();

        writer
            .await
            .unwrap_or_else(|e| panic!("{e}"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(read_file(&f.fs, "/shared").await, b"after");
    }

    #[tokio::test]
    async fn test_should_honor_overwrite_flag() {
        let f = fixture();
        write_file(&f.fs, "/o", b"a much longer original body", CreateOptions::default()).await;

        let err = f.fs.create("/o", CreateOptions::default()).await;
        assert!(matches!(err, Err(FsError::AlreadyExists { .. })));

        write_file(&f.fs, "/o", b"short", CreateOptions::overwrite()).await;
        assert_eq!(read_file(&f.fs, "/o").await, b"short");
        let status = f.fs.get_status("/o").await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(status.len, 5);
    }

    #[tokio::test]
    async fn test_should_block_mkdirs_under_locked_directory() {
        let f = fixture();
        let held = f
            .fs
            .lock_table()
            .try_acquire("hbase/d/")
            .unwrap_or_else(|| panic!("lock"));

        let mkdirs = {
            let fs = Arc::clone(&f.fs);
            tokio::spawn(async move { fs.mkdirs("/d/sub").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!mkdirs.is_finished());
        assert!(!f.fs.exists("/d/sub").await.unwrap_or_else(|e| panic!("{e}")));

        held.release();
        mkdirs
            .await
            .unwrap_or_else(|e| panic!("{e}"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(f.fs.get_status("/d/sub").await.unwrap_or_else(|e| panic!("{e}")).is_dir);
        assert!(f.fs.lock_table().held().is_empty());
    }

    #[tokio::test]
    async fn test_should_recreate_path_after_writer_dropped_unclosed() {
        let f = fixture();
        let mut w = f
            .fs
            .create("/f", CreateOptions::default())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        w.write(b"x").await.unwrap_or_else(|e| panic!("{e}"));
        drop(w);

        assert_eq!(f.fs.open_writers(), 0);
        assert!(f.fs.lock_table().held().is_empty());
        assert!(!f.fs.exists("/f").await.unwrap_or_else(|e| panic!("{e}")));

        write_file(&f.fs, "/f", b"fresh", CreateOptions::overwrite()).await;
        assert_eq!(read_file(&f.fs, "/f").await, b"fresh");
        assert!(f.fs.delete("/", true).await.unwrap_or_else(|e| panic!("{e}")));
    }

    #[tokio::test]
    async fn test_should_accept_scheme_separator_inside_segment() {
        let f = fixture();
        f.fs.mkdirs("/a/b://c").await.unwrap_or_else(|e| panic!("{e}"));
        let status = f
            .fs
            .get_status("/a/b://c")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(status.is_dir);
    }

    #[tokio::test]
    async fn test_should_report_read_buffer_as_block_size() {
        let f = fixture();
        assert_eq!(f.fs.default_block_size(), 5);
        assert_eq!(f.fs.default_part_size(), PART);
    }

    #[tokio::test]
    async fn test_should_reject_directory_targets() {
        let f = fixture();
        f.fs.mkdirs("/dir").await.unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            f.fs.create("/dir", CreateOptions::overwrite()).await,
            Err(FsError::NotAFile { .. })
        ));
        assert!(matches!(
            f.fs.open("/dir").await,
            Err(FsError::NotAFile { .. })
        ));
        assert!(matches!(
            f.fs.open("/nothing").await,
            Err(FsError::NotFound { .. })
        ));
        assert!(f.fs.lock_table().held().is_empty());
    }

    #[tokio::test]
    async fn test_should_require_parent_for_non_recursive_create() {
        let f = fixture();
        assert!(matches!(
            f.fs
                .create_non_recursive("/missing/file", CreateOptions::default())
                .await,
            Err(FsError::NotFound { .. })
        ));

        write_file(&f.fs, "/plain", b"p", CreateOptions::default()).await;
        assert!(matches!(
            f.fs
                .create_non_recursive("/plain/child", CreateOptions::default())
                .await,
            Err(FsError::NotADirectory { .. })
        ));

        f.fs.mkdirs("/parent").await.unwrap_or_else(|e| panic!("{e}"));
        let mut w = f
            .fs
            .create_non_recursive("/parent/child", CreateOptions::default())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        w.close().await.unwrap_or_else(|e| panic!("{e}"));
        assert!(f.fs.exists("/parent/child").await.unwrap_or_else(|e| panic!("{e}")));
    }

    #[tokio::test]
    async fn test_should_report_append_unsupported() {
        let f = fixture();
        assert!(matches!(
            f.fs.append("/x"),
            Err(FsError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_resolve_relative_and_qualified_paths() {
        let f = fixture();
        assert_eq!(f.fs.uri(), "minio://test/");
        f.fs.mkdirs("/user/hbase").await.unwrap_or_else(|e| panic!("{e}"));
        f.fs
            .set_working_directory("/user/hbase")
            .unwrap_or_else(|e| panic!("{e}"));
        write_file(&f.fs, "rel", b"r", CreateOptions::default()).await;

        let status = f
            .fs
            .get_status("minio://test/user/hbase/rel")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(status.path.as_str(), "/user/hbase/rel");
        assert!(f.store.keys().contains(&"hbase/user/hbase/rel".to_owned()));

        assert!(matches!(
            f.fs.get_status("minio://other/x").await,
            Err(FsError::InvalidPath { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_close_open_writers_on_shutdown() {
        let f = fixture();
        let mut w = f
            .fs
            .create("/pending", CreateOptions::default())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        w.write(b"unflushed bytes").await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(f.fs.open_writers(), 1);

        f.fs.close().await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(f.fs.open_writers(), 0);
        assert!(f.fs.lock_table().is_closed());

        let data = f
            .store
            .get_range("hbase/pending", 0, 1024)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(data.as_ref(), b"unflushed bytes");
        w.close().await.unwrap_or_else(|e| panic!("{e}"));

        assert!(matches!(
            f.fs.exists("/pending").await,
            Err(FsError::Closed { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_fail_pending_lock_waiters_on_shutdown() {
        let f = fixture();
        write_file(&f.fs, "/busy", b"b", CreateOptions::default()).await;
        let _reader = f.fs.open("/busy").await.unwrap_or_else(|e| panic!("{e}"));

        let waiter = {
            let fs = Arc::clone(&f.fs);
            tokio::spawn(async move { fs.delete("/busy", false).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        f.fs.shutdown(Duration::from_millis(100))
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let result = waiter.await.unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(result, Err(FsError::LockTimeout { .. })));
    }
}
