// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State snapshots and their delivery.
//!
//! A session reports progress only through [`StateSnapshot`]s. Each one is
//! delivered three ways:
//!
//! - [`SnapshotBus`] - tokio broadcast channel for async subscribers
//! - [`SnapshotCallbacks`] - synchronous callbacks registered with `on_snapshot`
//! - a `watch` channel holding the latest snapshot
//!
//! # Examples
//!
//! ```
//! use tempc_lib::snapshot::{SnapshotBus, StateSnapshot};
//!
//! let bus = SnapshotBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(StateSnapshot::status("Scanning"));
//! assert_eq!(rx.try_recv().unwrap().message(), Some("Scanning"));
//! ```

mod bus;
mod callback;
mod emitter;
mod state_snapshot;

pub use bus::SnapshotBus;
pub use callback::{SnapshotCallbacks, SubscriptionId};
pub use emitter::SnapshotEmitter;
pub use state_snapshot::{Readings, StateSnapshot};
