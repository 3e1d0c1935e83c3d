// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast bus for session snapshots.

use tokio::sync::broadcast;

use super::StateSnapshot;

/// Default channel capacity for the snapshot bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Fan-out of snapshots to any number of async subscribers.
///
/// Each subscriber gets its own copy of every snapshot published after it
/// subscribed. A subscriber that falls more than the channel capacity
/// behind receives `RecvError::Lagged` and skips the oldest snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotBus {
    sender: broadcast::Sender<StateSnapshot>,
}

impl SnapshotBus {
    /// Creates a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new bus with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to snapshots.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateSnapshot> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes a snapshot to all subscribers.
    ///
    /// Without subscribers the snapshot is discarded.
    pub fn publish(&self, snapshot: StateSnapshot) {
        // No subscribers is not an error
        let _ = self.sender.send(snapshot);
    }
}

impl Default for SnapshotBus {
    fn default() -> Self {
        Self::new()
    }
}
