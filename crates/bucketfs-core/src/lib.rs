//! Hierarchical file system over an S3-compatible object store.
//!
//! Object stores offer a flat key space with put, ranged get, head, list by
//! prefix, copy, compose and single-key delete. This crate builds
//! directories, recursive listings, deletes and renames, buffered random
//! reads and multipart writes on top of those primitives, for storage
//! engines that expect a POSIX-like file system.
//!
//! # Architecture
//!
//! ```text
//! BucketFileSystem (paths, working dir, shutdown)
//!        |
//!        +-- PrefixLockTable (advisory prefix locks)
//!        |
//!        +-- RangedReader / SpillingWriter
//!        |          |
//!        |          v
//!        |   MultipartUploadCoordinator (staging + compose)
//!        |          |
//!        v          v
//!   DirectoryModel (markers, list, delete, rename)
//!        |
//!        v
//!   PathKeyMapper + status synthesis
//!        |
//!        v
//!   dyn ObjectStore (MemoryObjectStore, S3 in bucketfs-s3)
//! ```
//!
//! Directories are zero-byte marker objects whose keys end in `/`. The root
//! directory is implicit and never has a marker.

pub mod config;
pub mod error;
pub mod filesystem;
pub mod io;
pub mod lock;
pub mod multipart;
pub mod ops;
pub mod path;
pub mod status;
pub mod store;

pub use config::FsConfig;
pub use error::{FsError, FsResult, StoreError};
pub use filesystem::{BucketFileSystem, CreateOptions};
pub use io::{RangedReader, SpillingWriter, WriterStats};
pub use path::{FsPath, PathKeyMapper};
pub use status::FileStatus;
pub use store::{MemoryObjectStore, ObjectStore};
