//! Directory operation integration tests.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use bucketfs_core::{CreateOptions, FsError};

    use crate::{cleanup_bucket, create_test_fs, test_config};

    #[tokio::test]
    #[ignore = "requires running object store"]
    async fn test_should_mkdirs_and_list() {
        let spill = tempfile::tempdir().expect("tempdir");
        let (fs, store) = create_test_fs(test_config("mkdirs", spill.path())).await;

        fs.mkdirs("/a/b/c").await.expect("mkdirs");
        fs.mkdirs("/a/b/c").await.expect("mkdirs again");
        let mut w = fs
            .create("/a/file", CreateOptions::default())
            .await
            .expect("create");
        w.write(b"x").await.expect("write");
        w.close().await.expect("close");

        let listed = fs.list_status("/a").await.expect("list");
        let names: BTreeSet<String> = listed.iter().map(|s| s.path.to_string()).collect();
        let expected: BTreeSet<String> = ["/a/b", "/a/file"].iter().map(ToString::to_string).collect();
        assert_eq!(names, expected);

        let all = fs.list_status_recursive("/a").await.expect("list recursive");
        assert_eq!(all.len(), 3);

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running object store"]
    async fn test_should_delete_and_rename_trees() {
        let spill = tempfile::tempdir().expect("tempdir");
        let (fs, store) = create_test_fs(test_config("tree", spill.path())).await;

        for raw in ["/src/one", "/src/sub/two"] {
            let mut w = fs.create(raw, CreateOptions::default()).await.expect("create");
            w.write(raw.as_bytes()).await.expect("write");
            w.close().await.expect("close");
        }

        assert!(matches!(
            fs.delete("/src", false).await,
            Err(FsError::DirectoryNotEmpty { .. })
        ));

        fs.rename("/src", "/dst").await.expect("rename");
        assert!(!fs.exists("/src").await.expect("exists"));
        assert!(fs.exists("/dst/sub/two").await.expect("exists"));

        assert!(fs.delete("/dst", true).await.expect("delete"));
        assert!(!fs.exists("/dst").await.expect("exists"));
        assert!(!fs.delete("/dst", true).await.expect("delete missing"));

        cleanup_bucket(&store).await;
    }
}
