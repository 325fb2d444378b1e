//! Per-operation in-flight tracking

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Set of operation ids currently running. Clones share the same set, so a
/// UI can ask about one card while a spawned task holds its guard.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as running. Returns `None` when it already is.
    pub fn begin(&self, id: impl Into<String>) -> Option<InFlightGuard> {
        let id = id.into();
        if !self.ids.lock().insert(id.clone()) {
            tracing::debug!("Operation {} already in flight", id);
            return None;
        }
        Some(InFlightGuard {
            ids: self.ids.clone(),
            id,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}

/// Ends the operation when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlightGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ids.lock().remove(&self.id);
    }
}
