// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronous snapshot callbacks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::StateSnapshot;

/// Unique identifier for a registered callback, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type SnapshotCallback = Arc<dyn Fn(&StateSnapshot) + Send + Sync>;

/// Registry of `on_snapshot` callbacks.
///
/// Callbacks run on the session task for every emitted snapshot, in the
/// order they were registered. They must not block.
pub struct SnapshotCallbacks {
    next_id: AtomicU64,
    callbacks: RwLock<BTreeMap<SubscriptionId, SnapshotCallback>>,
}

impl SnapshotCallbacks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a callback.
    pub fn on_snapshot<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Removes a callback. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.write().remove(&id).is_some()
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns `true` if no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    /// Calls every registered callback with the snapshot.
    pub fn dispatch(&self, snapshot: &StateSnapshot) {
        // Clone the handles so a callback may (un)subscribe without deadlocking
        let callbacks: Vec<SnapshotCallback> = self.callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(snapshot);
        }
    }
}

impl Default for SnapshotCallbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SnapshotCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotCallbacks")
            .field("count", &self.len())
            .finish_non_exhaustive()
    }
}
