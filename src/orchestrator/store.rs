//! Concurrent status table shared between pipelines and pollers.

use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, warn};

use super::status::{RequestId, StatusRecord};

/// Per-request status records.
///
/// Each pipeline writes only its own entry; readers get a cloned snapshot.
/// Writes go through [`transition`](Self::transition), which refuses to move
/// a record backwards or out of a terminal state.
#[derive(Debug, Default)]
pub struct StatusStore {
    records: DashMap<RequestId, StatusRecord>,
}

impl StatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the first record for `id`. Returns false if `id` already exists.
    pub fn insert_new(&self, id: RequestId, record: StatusRecord) -> bool {
        match self.records.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                warn!(request_id = %id, "request id already present, not overwriting");
                false
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Replaces the record for `id` if the state change is allowed.
    ///
    /// Returns false (and logs) for unknown ids and backward transitions.
    pub fn transition(&self, id: RequestId, next: StatusRecord) -> bool {
        let Some(mut current) = self.records.get_mut(&id) else {
            warn!(request_id = %id, state = %next.state, "transition for unknown request id");
            return false;
        };

        if !current.state.can_transition_to(next.state) {
            warn!(
                request_id = %id,
                from = %current.state,
                to = %next.state,
                "rejected backward status transition"
            );
            return false;
        }

        if current.state != next.state {
            debug!(request_id = %id, from = %current.state, to = %next.state, "status transition");
        }
        *current = next;
        true
    }

    /// Snapshot of the record for `id`.
    #[must_use]
    pub fn get(&self, id: &RequestId) -> Option<StatusRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    /// Number of tracked requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no requests are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops completed/failed records last written more than `ttl` ago.
    ///
    /// Returns the number of records removed.
    pub fn prune_terminal_older_than(&self, ttl: Duration) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| {
            let expired = record
                .updated_at
                .elapsed()
                .is_ok_and(|age| age > ttl);
            !(record.state.is_terminal() && expired)
        });
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!(removed, "pruned expired status records");
        }
        removed
    }
}
