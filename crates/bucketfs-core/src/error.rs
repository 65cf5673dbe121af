//! Error types for the file system adapter.
//!
//! [`FsError`] is the single error surfaced by every public operation. Its
//! variants separate structural failures ("the operation is logically
//! impossible") from backend faults ("the object store is unreachable or
//! misbehaving") so callers can decide whether a retry makes sense.
//!
//! [`StoreError`] is what an [`ObjectStore`](crate::store::ObjectStore)
//! implementation returns. It converts into [`FsError::Backend`] unchanged;
//! this layer never retries or masks a backend failure.
//!
//! # Usage
//!
//! ```
//! use bucketfs_core::error::FsError;
//!
//! let err = FsError::NotFound {
//!     path: "/data/table".to_owned(),
//! };
//! assert!(err.is_not_found());
//! assert!(!err.is_retryable());
//! ```

/// Errors produced by an object store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key does not exist in the bucket.
    #[error("object not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// Any other backend fault: auth, network, malformed response.
    #[error("object store request failed: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether this error reports a missing key.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// File system adapter error type.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // -----------------------------------------------------------------------
    // Structural errors
    // -----------------------------------------------------------------------
    /// The path does not exist.
    #[error("no such file or directory: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },

    /// The path already exists and overwrite was not requested.
    #[error("path already exists: {path}")]
    AlreadyExists {
        /// The existing path.
        path: String,
    },

    /// A path component that must be a directory is a file.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: String,
    },

    /// The path is a directory where a file was expected.
    #[error("not a file: {path}")]
    NotAFile {
        /// The offending path.
        path: String,
    },

    /// Non-recursive delete of a directory that still has children.
    #[error("directory is not empty: {path}")]
    DirectoryNotEmpty {
        /// The non-empty directory.
        path: String,
    },

    /// Both a file object and a directory marker exist for the same path.
    #[error("both a file and a directory marker exist for {path}")]
    AmbiguousPath {
        /// The path with two backing objects.
        path: String,
    },

    /// The path cannot be mapped onto the configured bucket and root.
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    // -----------------------------------------------------------------------
    // Stream errors
    // -----------------------------------------------------------------------
    /// Seek past the end of the file.
    #[error("cannot seek to {position} in {path} of length {len}")]
    InvalidSeek {
        /// The file being read.
        path: String,
        /// The requested position.
        position: u64,
        /// The file length.
        len: u64,
    },

    /// The backend returned no data before the known end of the file.
    #[error("unexpected end of {path} at {position} (expected {len} bytes)")]
    UnexpectedEof {
        /// The file being read.
        path: String,
        /// Where the read stalled.
        position: u64,
        /// The length reported at open.
        len: u64,
    },

    /// A multipart upload was completed with a gap in its part numbers.
    #[error("multipart upload for {path} is missing part {part_number}")]
    MissingPart {
        /// The destination path of the upload.
        path: String,
        /// The first missing part number.
        part_number: u32,
    },

    /// The stream or file system has already been closed.
    #[error("{what} is closed")]
    Closed {
        /// What was closed.
        what: String,
    },

    // -----------------------------------------------------------------------
    // Coordination errors
    // -----------------------------------------------------------------------
    /// Waiting for a prefix lock was interrupted or timed out.
    #[error("gave up waiting for lock on prefix {prefix:?}")]
    LockTimeout {
        /// The prefix that could not be locked.
        prefix: String,
    },

    /// The operation is not supported by this file system.
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// The unsupported operation.
        operation: String,
    },

    /// Persisted multipart handle bytes could not be decoded.
    #[error("invalid multipart handle: {0}")]
    InvalidHandle(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Faults
    // -----------------------------------------------------------------------
    /// The object store failed.
    #[error(transparent)]
    Backend(#[from] StoreError),

    /// Local spill file I/O failed.
    #[error("local spill file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Whether this error reports a missing path.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure came from the backend or local I/O rather than
    /// from the logical state of the file system.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Io(_))
    }

    pub(crate) fn not_found(path: impl ToString) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    pub(crate) fn invalid_path(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience result type for file system operations.
pub type FsResult<T> = Result<T, FsError>;
