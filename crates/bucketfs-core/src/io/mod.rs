//! Streaming I/O over objects.
//!
//! - [`RangedReader`] serves random-access reads from a buffer refilled with
//!   ranged GETs.
//! - [`SpillingWriter`] spills sequential writes to local part files and
//!   finalizes them through the multipart coordinator.
//!
//! Every open writer is tracked in a [`StreamRegistry`] so the file system can
//! close stragglers on shutdown.

mod reader;
mod writer;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::Mutex;

pub use reader::RangedReader;
pub use writer::{SpillingWriter, WriterStats};
pub(crate) use writer::WriterState;

/// Writers that have been created but not yet closed.
#[derive(Debug, Default)]
pub(crate) struct StreamRegistry {
    next_id: AtomicU64,
    writers: DashMap<u64, Arc<Mutex<WriterState>>>,
}

impl StreamRegistry {
    pub(crate) fn register(&self, state: Arc<Mutex<WriterState>>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.writers.insert(id, state);
        id
    }

    pub(crate) fn deregister(&self, id: u64) {
        self.writers.remove(&id);
    }

    /// Remove and return every registered writer.
    pub(crate) fn drain(&self) -> Vec<Arc<Mutex<WriterState>>> {
        let ids: Vec<u64> = self.writers.iter().map(|e| *e.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.writers.remove(&id).map(|(_, state)| state))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.writers.len()
    }
}
