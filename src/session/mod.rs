// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device session lifecycle.
//!
//! A session binds to one thermostat and keeps reading it until stopped:
//!
//! ```text
//! Idle -> Scanning -> Connecting -> DiscoveringServices -> Polling
//!                        ^                                   |
//!                        +---------- Reconnecting <----------+
//! ```
//!
//! The lifecycle is split in two layers:
//!
//! - [`SessionMachine`] decides. It maps `(state, event)` to a list of
//!   [`Effect`]s and never touches a transport or a clock.
//! - The driver acts. It runs on one tokio task per session, executes the
//!   effects against a [`Transport`](crate::transport::Transport) and feeds
//!   the outcomes back as [`SessionEvent`]s.
//!
//! Consumers only see [`SessionHandle`].

mod driver;
mod effect;
mod event;
mod handle;
mod machine;
mod session_id;
mod setpoint;
mod state;

pub use effect::Effect;
pub use event::{Attribute, ServiceLookup, SessionEvent, Timer};
pub use handle::SessionHandle;
pub use machine::{
    ERROR_SERVICE_NOT_FOUND, STATUS_DISCOVERING, STATUS_READING, STATUS_SCANNING, SessionMachine,
};
pub use session_id::SessionId;
pub use setpoint::{Setpoint, SetpointInbox};
pub use state::{PollPhase, SessionState};
