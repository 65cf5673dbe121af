//! Hierarchical paths and their mapping onto object keys.
//!
//! [`FsPath`] is a normalized absolute path. [`PathKeyMapper`] turns paths
//! into bucket-relative keys under the configured root prefix and back:
//!
//! ```text
//! root prefix "hbase/"
//!   /                 -> "hbase/"            (root, never has a marker)
//!   /data/t1          -> "hbase/data/t1"     (file)
//!   /data             -> "hbase/data/"       (directory marker)
//! ```
//!
//! A file key never ends in `/` and a directory marker always does, so the
//! two representations of one logical name cannot collide.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::FsConfig;
use crate::error::{FsError, FsResult};

const SEPARATOR: char = '/';

/// A normalized absolute path.
///
/// Always starts with `/`, never ends with `/` (except the root itself),
/// never contains empty, `.` or `..` segments.
///
/// # Examples
///
/// ```
/// use bucketfs_core::path::FsPath;
///
/// let path: FsPath = "/data//t1/./regions/../meta".parse().unwrap();
/// assert_eq!(path.as_str(), "/data/t1/meta");
/// assert_eq!(path.name(), "meta");
/// assert_eq!(path.parent().unwrap().as_str(), "/data/t1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FsPath(String);

impl FsPath {
    /// The root path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Parse an absolute path, normalizing it.
    pub fn new(raw: &str) -> FsResult<Self> {
        if !raw.starts_with(SEPARATOR) {
            return Err(FsError::invalid_path(raw, "path is not absolute"));
        }
        Ok(Self::root().resolve(raw))
    }

    /// Resolve `raw` against this path. Absolute input ignores `self`.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Self {
        let mut segments: Vec<&str> = if raw.starts_with(SEPARATOR) {
            Vec::new()
        } else {
            self.segments().collect()
        };
        for segment in raw.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        Self::from_segments(&segments)
    }

    /// Append a relative child path.
    #[must_use]
    pub fn join(&self, child: &str) -> Self {
        self.resolve(child.trim_start_matches(SEPARATOR))
    }

    /// Whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
        }
    }

    /// The last segment, empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0
            .rsplit(SEPARATOR)
            .next()
            .unwrap_or_default()
    }

    /// The path segments, root excluded.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// This path and every ancestor below the root, deepest first.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::with_capacity(self.depth());
        let mut current = Some(self.clone());
        while let Some(path) = current {
            if path.is_root() {
                break;
            }
            current = path.parent();
            out.push(path);
        }
        out
    }

    /// Whether `self` equals `other` or lies below it, by whole segments.
    #[must_use]
    pub fn is_within(&self, other: &Self) -> bool {
        other.is_root()
            || self == other
            || (self.0.starts_with(&other.0) && self.0[other.0.len()..].starts_with(SEPARATOR))
    }

    /// The path as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_segments(segments: &[&str]) -> Self {
        let mut out = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
        for segment in segments {
            out.push(SEPARATOR);
            out.push_str(segment);
        }
        if out.is_empty() {
            out.push(SEPARATOR);
        }
        Self(out)
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FsPath {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FsPath {
    type Error = FsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<FsPath> for String {
    fn from(path: FsPath) -> Self {
        path.0
    }
}

impl AsRef<str> for FsPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Translates between [`FsPath`]s and object keys.
#[derive(Debug, Clone)]
pub struct PathKeyMapper {
    bucket: String,
    /// Either empty or ends with `/`; never starts with `/`.
    root_prefix: String,
    scheme: String,
}

impl PathKeyMapper {
    /// Create a mapper for `bucket`, rooted at `root_prefix`.
    #[must_use]
    pub fn new(bucket: &str, root_prefix: &str, scheme: &str) -> Self {
        let trimmed = root_prefix.trim_matches(SEPARATOR);
        let root_prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}{SEPARATOR}")
        };
        Self {
            bucket: bucket.to_owned(),
            root_prefix,
            scheme: scheme.to_owned(),
        }
    }

    /// Create a mapper from the adapter configuration.
    #[must_use]
    pub fn from_config(config: &FsConfig) -> Self {
        Self::new(&config.bucket, &config.root_prefix, &config.scheme)
    }

    /// The bucket this mapper targets.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The normalized root prefix (empty or `/`-terminated).
    #[must_use]
    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// Parse a caller-supplied path, resolving relative input against `cwd`.
    ///
    /// Accepts absolute paths, relative paths and qualified
    /// `scheme://bucket/path` strings naming this mapper's bucket.
    pub fn parse(&self, raw: &str, cwd: &FsPath) -> FsResult<FsPath> {
        if raw.is_empty() {
            return Err(FsError::invalid_path(raw, "path is empty"));
        }
        if let Some(path) = self.strip_qualifier(raw)? {
            return Ok(path);
        }
        Ok(cwd.resolve(raw))
    }

    /// Parse a path in a context that requires absolute input.
    pub fn parse_absolute(&self, raw: &str) -> FsResult<FsPath> {
        if let Some(path) = self.strip_qualifier(raw)? {
            return Ok(path);
        }
        FsPath::new(raw)
    }

    /// The key of `path`, with a trailing `/` when it names a directory.
    ///
    /// The root maps to the bare root prefix.
    #[must_use]
    pub fn key_for(&self, path: &FsPath, is_dir: bool) -> String {
        if path.is_root() {
            return self.root_prefix.clone();
        }
        let relative = &path.as_str()[1..];
        let mut key = String::with_capacity(self.root_prefix.len() + relative.len() + 1);
        key.push_str(&self.root_prefix);
        key.push_str(relative);
        if is_dir {
            key.push(SEPARATOR);
        }
        key
    }

    /// The directory-style prefix scoping everything under `path`.
    #[must_use]
    pub fn prefix_for(&self, path: &FsPath) -> String {
        self.key_for(path, true)
    }

    /// The lock-table entry guarding `path`.
    ///
    /// Directory-style so that `/a/x` and `/a/xy` do not overlap while `/a`
    /// still covers both.
    #[must_use]
    pub fn lock_key_for(&self, path: &FsPath) -> String {
        self.prefix_for(path)
    }

    /// The path named by `key`. Marker keys map to their directory.
    pub fn path_for(&self, key: &str) -> FsResult<FsPath> {
        let relative = key.strip_prefix(&self.root_prefix).ok_or_else(|| {
            FsError::invalid_path(
                key,
                format!("key lies outside root prefix {:?}", self.root_prefix),
            )
        })?;
        Ok(FsPath::root().resolve(relative))
    }

    /// Whether `key` is a directory marker.
    #[must_use]
    pub fn is_dir_key(key: &str) -> bool {
        key.ends_with(SEPARATOR)
    }

    /// The fully qualified form of `path`, e.g. `bucketfs://bucket/a/b`.
    #[must_use]
    pub fn qualify(&self, path: &FsPath) -> String {
        format!("{}://{}{}", self.scheme, self.bucket, path)
    }

    /// A scheme counts only when `://` precedes the first `/`. Segments such
    /// as `x://y` inside a plain path are ordinary names.
    fn strip_qualifier(&self, raw: &str) -> FsResult<Option<FsPath>> {
        let Some(idx) = raw.find("://") else {
            return Ok(None);
        };
        if raw.find(SEPARATOR).is_some_and(|slash| slash < idx) {
            return Ok(None);
        }
        let rest = &raw[idx + 3..];
        let (authority, path) = match rest.find(SEPARATOR) {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        if authority != self.bucket {
            return Err(FsError::invalid_path(
                raw,
                format!("bucket {authority:?} is not {:?}", self.bucket),
            ));
        }
        FsPath::new(path).map(Some)
    }
}
