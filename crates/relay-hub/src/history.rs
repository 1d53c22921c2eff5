use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use relay_protocol::frames::HistoryEntry;

/// Bounded in-memory log of recent chat lines. Oldest entries fall off
/// once `capacity` is reached; nothing is written to disk.
pub struct History {
    entries: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<HistoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, entry: HistoryEntry) {
        self.push_then(entry, || ());
    }

    /// Append `entry`, then run `f` before the log is unlocked.
    ///
    /// Pairs with [`History::recent_then`]: work done in either closure is
    /// ordered against the other, which lets the hub take its broadcast
    /// snapshot and register newcomers without a line slipping between
    /// replay and live delivery.
    pub fn push_then<R>(&self, entry: HistoryEntry, f: impl FnOnce() -> R) -> R {
        let mut entries = self.lock();
        if self.capacity > 0 {
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
        f()
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        self.recent_then(n, || ()).0
    }

    /// The last `n` entries plus the result of `f`, run before the log is unlocked.
    pub fn recent_then<R>(&self, n: usize, f: impl FnOnce() -> R) -> (Vec<HistoryEntry>, R) {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(n);
        let recent = entries.iter().skip(skip).cloned().collect();
        (recent, f())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
