// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Projection of session state into snapshots.

use chrono::Utc;

use crate::history::SampleRing;
use crate::types::is_valid_reading;

use super::{Readings, StateSnapshot};

/// Builds snapshots from session state. Holds no state of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotEmitter;

impl SnapshotEmitter {
    /// Builds a status snapshot.
    #[must_use]
    pub fn status(message: impl Into<String>) -> StateSnapshot {
        StateSnapshot::status(message)
    }

    /// Builds a fatal error snapshot.
    #[must_use]
    pub fn error(message: impl Into<String>) -> StateSnapshot {
        StateSnapshot::error(message)
    }

    /// Builds a readings snapshot.
    ///
    /// A setpoint at or below the sentinel is reported as `None`.
    #[must_use]
    pub fn readings(ring: &SampleRing, temperature: f32, setpoint: f32) -> StateSnapshot {
        StateSnapshot::Readings(Readings {
            history: ring.view(),
            temperature,
            setpoint: is_valid_reading(setpoint).then_some(setpoint),
            captured_at: Utc::now(),
        })
    }
}
