//! Remote-ID lookup cache
//!
//! Maps server identifiers to arena ids so repeated lookups of the same
//! remote object do not walk the tree. The cache is owned by one tree (or
//! handed to it explicitly) and cloning it shares the same map.
//!
//! The map sits behind a mutex because external callers holding a clone may
//! evict entries while the tree is being mutated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::node::NodeId;

/// Shared remote-ID → node map
#[derive(Debug, Clone, Default)]
pub struct IdCache {
    inner: Arc<Mutex<HashMap<String, NodeId>>>,
}

impl IdCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, NodeId>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, remote_id: &str) -> Option<NodeId> {
        self.lock().get(remote_id).copied()
    }

    pub fn insert(&self, remote_id: &str, node: NodeId) {
        self.lock().insert(remote_id.to_string(), node);
    }

    /// Remove an entry; returns the evicted node id
    pub fn evict(&self, remote_id: &str) -> Option<NodeId> {
        self.lock().remove(remote_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
