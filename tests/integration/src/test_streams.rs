//! Reader and writer integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bucketfs_core::{BucketFileSystem, CreateOptions, FsError};

    use crate::{cleanup_bucket, create_test_fs, test_config};

    async fn read_all(fs: &BucketFileSystem, raw: &str) -> Vec<u8> {
        let mut reader = fs.open(raw).await.expect("open");
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.expect("read");
        reader.close();
        out
    }

    #[tokio::test]
    #[ignore = "requires running object store"]
    async fn test_should_round_trip_multipart_file() {
        let spill = tempfile::tempdir().expect("tempdir");
        let (fs, store) = create_test_fs(test_config("multipart", spill.path())).await;

        let part = fs.default_part_size();
        let data: Vec<u8> = (0..part * 2 + 1024).map(|i| (i % 251) as u8).collect();
        let mut w = fs
            .create("/big/file", CreateOptions::default())
            .await
            .expect("create");
        for chunk in data.chunks(64 * 1024) {
            w.write(chunk).await.expect("write");
        }
        w.close().await.expect("close");
        assert_eq!(w.stats().await.parts_uploaded, 3);

        let status = fs.get_status("/big/file").await.expect("status");
        assert_eq!(status.len, data.len() as u64);
        assert_eq!(read_all(&fs, "/big/file").await, data);

        let mut reader = fs.open("/big/file").await.expect("open");
        reader.seek(part as u64 + 10).await.expect("seek");
        let byte = reader.read_byte().await.expect("read byte");
        assert_eq!(byte, Some(data[part + 10]));
        reader.close();

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running object store"]
    async fn test_should_round_trip_empty_file() {
        let spill = tempfile::tempdir().expect("tempdir");
        let (fs, store) = create_test_fs(test_config("empty", spill.path())).await;

        let mut w = fs
            .create("/empty", CreateOptions::default())
            .await
            .expect("create");
        w.close().await.expect("close");
        assert!(read_all(&fs, "/empty").await.is_empty());

        assert!(matches!(
            fs.create("/empty", CreateOptions::default()).await,
            Err(FsError::AlreadyExists { .. })
        ));

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running object store"]
    async fn test_should_block_writer_until_reader_closes() {
        let spill = tempfile::tempdir().expect("tempdir");
        let (fs, store) = create_test_fs(test_config("locks", spill.path())).await;

        let mut w = fs.create("/p", CreateOptions::default()).await.expect("create");
        w.write(b"v1").await.expect("write");
        w.close().await.expect("close");

        let mut reader = fs.open("/p").await.expect("open");
        let writer = {
            let fs = Arc::clone(&fs);
            tokio::spawn(async move {
                let mut w = fs.create("/p", CreateOptions::overwrite()).await?;
                w.write(b"v2").await?;
                w.close().await
            })
        };

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!writer.is_finished());
        reader.close();
        writer.await.expect("join").expect("overwrite");
        assert_eq!(read_all(&fs, "/p").await, b"v2");

        fs.shutdown(Duration::from_secs(5)).await.expect("shutdown");
        cleanup_bucket(&store).await;
    }
}
