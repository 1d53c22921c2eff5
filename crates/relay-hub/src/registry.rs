use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use relay_core::ConnId;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{HubError, Result};

type Entries = HashMap<ConnId, Arc<dyn Connection>>;

/// Set of currently registered connections, keyed by id.
///
/// One mutex covers add, remove and snapshot, so a snapshot is always a
/// consistent copy. The lock is never held across an `.await`; callers
/// iterate the snapshot after it is released.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<Entries>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-written:
    // every critical section is a single HashMap call.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a newly established connection.
    ///
    /// An id that is already present is rejected and the existing entry
    /// stays untouched.
    pub fn add(&self, id: ConnId, conn: Arc<dyn Connection>) -> Result<()> {
        let mut entries = self.lock();
        if entries.contains_key(&id) {
            warn!(conn_id = %id, "duplicate registration rejected");
            return Err(HubError::DuplicateId { id });
        }
        debug!(conn_id = %id, total = entries.len() + 1, "connection registered");
        entries.insert(id, conn);
        Ok(())
    }

    /// Deregister a connection. Returns `false` when the id was not present,
    /// which is expected when a disconnect races a self-healing removal.
    pub fn remove(&self, id: &ConnId) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            debug!(conn_id = %id, "connection deregistered");
        }
        removed
    }

    /// Remove `conn` only if it is the exact connection registered under its id.
    pub fn remove_if_same(&self, conn: &Arc<dyn Connection>) -> bool {
        let mut entries = self.lock();
        let same = entries
            .get(conn.id())
            .is_some_and(|current| Arc::ptr_eq(current, conn));
        if same {
            entries.remove(conn.id());
        }
        same
    }

    /// Point-in-time copy of every registered connection, in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<dyn Connection>> {
        self.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: &ConnId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn ids(&self) -> Vec<ConnId> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every registration and return the ids that were removed.
    pub fn clear(&self) -> Vec<ConnId> {
        self.lock().drain().map(|(id, _)| id).collect()
    }
}
