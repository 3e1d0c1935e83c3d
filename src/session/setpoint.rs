// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Setpoint bookkeeping and the single-slot command inbox.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::{MIN_TEMPERATURE, is_valid_reading};

/// Last known target temperature of the device.
///
/// The setpoint counts as unknown until the device has confirmed a real
/// value since the last (re)connect, either by a read or by acknowledging a
/// write. A sentinel read leaves it unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setpoint {
    value: f32,
    refreshed_at: Option<Instant>,
}

impl Setpoint {
    /// Creates an unknown setpoint.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            value: MIN_TEMPERATURE,
            refreshed_at: None,
        }
    }

    /// Returns the value if it is a real temperature.
    #[must_use]
    pub fn value(&self) -> Option<f32> {
        is_valid_reading(self.value).then_some(self.value)
    }

    /// Returns the raw value, which may be the sentinel.
    #[must_use]
    pub fn raw(&self) -> f32 {
        self.value
    }

    /// Returns when the device last confirmed the value.
    #[must_use]
    pub fn refreshed_at(&self) -> Option<Instant> {
        self.refreshed_at
    }

    /// Returns `true` if the value must be read from the device.
    #[must_use]
    pub fn needs_refresh(&self, now: Instant, max_age: Duration) -> bool {
        self.value().is_none()
            || self
                .refreshed_at
                .is_none_or(|at| now.saturating_duration_since(at) > max_age)
    }

    /// Records a value confirmed by the device.
    pub fn confirm(&mut self, value: f32, now: Instant) {
        self.value = value;
        self.refreshed_at = Some(now);
    }

    /// Records a value the consumer asked for. The device has not confirmed it.
    pub fn stage(&mut self, value: f32) {
        self.value = value;
    }

    /// Forgets the value so it is read again.
    pub fn invalidate(&mut self) {
        *self = Self::unknown();
    }
}

impl Default for Setpoint {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Single-slot inbox for setpoint commands. The last request wins.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetpointInbox {
    pending: Option<f32>,
}

impl SetpointInbox {
    /// Stores a request, replacing any unsent one.
    pub fn request(&mut self, value: f32) {
        self.pending = Some(value);
    }

    /// Returns the pending request without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<f32> {
        self.pending
    }

    /// Clears the request if it still holds `written`.
    ///
    /// A newer request that arrived while `written` was in flight is kept.
    /// Returns `true` if the inbox was cleared.
    pub fn acknowledge(&mut self, written: f32) -> bool {
        if self.pending.is_some_and(|v| v.to_bits() == written.to_bits()) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Drops any pending request.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
