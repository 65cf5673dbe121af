//! Integration tests for bucketfs over a live S3-compatible server.
//!
//! These tests require a running object store (MinIO, LocalStack or AWS).
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! BUCKETFS_ENDPOINT=http://localhost:9000 \
//! BUCKETFS_ACCESS_KEY=minioadmin BUCKETFS_SECRET_KEY=minioadmin \
//!   cargo test -p bucketfs-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use bucketfs_core::{BucketFileSystem, FsConfig};
use bucketfs_s3::S3ObjectStore;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Configuration from `BUCKETFS_*` variables, with a fresh bucket name.
#[must_use]
pub fn test_config(prefix: &str, spill_dir: &std::path::Path) -> FsConfig {
    init_tracing();
    let mut config = FsConfig::from_env().unwrap_or_else(|e| panic!("bad environment: {e}"));
    config.bucket = test_bucket_name(prefix);
    config.root_prefix = "fs-root".to_owned();
    config.spill_dir = spill_dir.to_path_buf();
    config.lock_poll_interval_ms = 20;
    config
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_owned();
    format!("bucketfs-{prefix}-{id}")
}

/// Create the bucket named in `config` and a file system over it.
pub async fn create_test_fs(config: FsConfig) -> (Arc<BucketFileSystem>, S3ObjectStore) {
    let store = S3ObjectStore::from_config(&config);
    store
        .client()
        .create_bucket()
        .bucket(store.bucket())
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create bucket {}: {e}", store.bucket()));
    let fs = BucketFileSystem::new(config, Arc::new(store.clone()))
        .unwrap_or_else(|e| panic!("failed to build file system: {e}"));
    (Arc::new(fs), store)
}

/// Delete all objects in the bucket, then delete the bucket.
pub async fn cleanup_bucket(store: &S3ObjectStore) {
    let client = store.client();
    let bucket = store.bucket();
    let mut continuation_token = None;
    loop {
        let mut req = client.list_objects_v2().bucket(bucket);
        if let Some(token) = continuation_token.take() {
            req = req.continuation_token(token);
        }
        let Ok(resp) = req.send().await else {
            return;
        };

        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                let _ = client.delete_object().bucket(bucket).key(key).send().await;
            }
        }

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(ToOwned::to_owned);
        } else {
            break;
        }
    }

    let _ = client.delete_bucket().bucket(bucket).send().await;
}

mod test_directory;
mod test_streams;
