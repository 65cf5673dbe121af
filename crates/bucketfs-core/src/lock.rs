//! Advisory prefix locks.
//!
//! A [`PrefixLockTable`] holds the key prefixes currently owned by open
//! streams and in-progress destructive calls. Two prefixes conflict when one
//! starts with the other, so a lock on `a/` covers every key below it.
//!
//! Waiters poll the table at a fixed interval. There is no queue and no
//! fairness: whichever waiter polls first after a release wins.
//!
//! ```text
//!   held: ["data/t1/"]
//!   acquire("data/")       -> waits (covers data/t1/)
//!   acquire("data/t1/f/")  -> waits (below data/t1/)
//!   acquire("data/t2/")    -> granted
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::DEFAULT_LOCK_POLL_INTERVAL_MS;
use crate::error::{FsError, FsResult};

/// Shared registry of held prefix locks.
#[derive(Debug)]
pub struct PrefixLockTable {
    entries: Mutex<HashMap<u64, String>>,
    next_id: AtomicU64,
    poll_interval: Duration,
    timeout: Option<Duration>,
    closed: AtomicBool,
}

impl Default for PrefixLockTable {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_LOCK_POLL_INTERVAL_MS), None)
    }
}

fn conflicts(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

impl PrefixLockTable {
    /// Create a table polling every `poll_interval`, giving up after
    /// `timeout` when one is set.
    #[must_use]
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            poll_interval,
            timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Take `prefix` if nothing conflicting is held.
    #[must_use]
    pub fn try_acquire(self: &Arc<Self>, prefix: &str) -> Option<PrefixLock> {
        self.try_acquire_all(&[prefix.to_owned()])
    }

    /// Take `prefix`, waiting for conflicting holders to release.
    pub async fn acquire(self: &Arc<Self>, prefix: &str) -> FsResult<PrefixLock> {
        self.acquire_all(&[prefix.to_owned()]).await
    }

    /// Take every prefix in `prefixes` at once, waiting until none conflict
    /// with a held entry.
    ///
    /// Fails with [`FsError::LockTimeout`] when the table is closed or the
    /// configured timeout elapses.
    pub async fn acquire_all(self: &Arc<Self>, prefixes: &[String]) -> FsResult<PrefixLock> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            if self.is_closed() {
                return Err(self.timeout_error(prefixes));
            }
            if let Some(lock) = self.try_acquire_all(prefixes) {
                return Ok(lock);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(?prefixes, "lock wait timed out");
                return Err(self.timeout_error(prefixes));
            }
            trace!(?prefixes, "waiting for prefix lock");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Stop granting locks. Current and future waiters fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Snapshot of the held prefixes.
    #[must_use]
    pub fn held(&self) -> Vec<String> {
        let mut held: Vec<String> = self.entries.lock().values().cloned().collect();
        held.sort();
        held
    }

    fn try_acquire_all(self: &Arc<Self>, prefixes: &[String]) -> Option<PrefixLock> {
        if self.is_closed() {
            return None;
        }
        let mut entries = self.entries.lock();
        let blocked = prefixes
            .iter()
            .any(|p| entries.values().any(|held| conflicts(p, held)));
        if blocked {
            return None;
        }
        let ids = prefixes
            .iter()
            .map(|p| {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                entries.insert(id, p.clone());
                id
            })
            .collect();
        trace!(?prefixes, "prefix lock acquired");
        Some(PrefixLock {
            table: Arc::clone(self),
            ids,
            prefixes: prefixes.to_vec(),
        })
    }

    fn release(&self, ids: &[u64]) {
        let mut entries = self.entries.lock();
        for id in ids {
            entries.remove(id);
        }
    }

    fn timeout_error(&self, prefixes: &[String]) -> FsError {
        FsError::LockTimeout {
            prefix: prefixes.join(","),
        }
    }
}

/// A held lock. Releases its own entries when released or dropped.
#[derive(Debug)]
pub struct PrefixLock {
    table: Arc<PrefixLockTable>,
    ids: Vec<u64>,
    prefixes: Vec<String>,
}

impl PrefixLock {
    /// The prefixes this guard holds.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Release the lock now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PrefixLock {
    fn drop(&mut self) {
        self.table.release(&self.ids);
        trace!(prefixes = ?self.prefixes, "prefix lock released");
    }
}
