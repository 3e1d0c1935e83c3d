// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session lifecycle states.

use std::fmt;

/// Lifecycle state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SessionState {
    /// Not started, or fully reset.
    #[default]
    Idle,
    /// Looking for the device.
    Scanning,
    /// Connecting to the bound device.
    Connecting,
    /// Resolving the thermostat service.
    DiscoveringServices,
    /// Steady-state read/write loop.
    Polling(PollPhase),
    /// Waiting to reconnect after the link dropped.
    Reconnecting,
    /// Halted by the consumer or by a fatal error.
    Stopped,
}

impl SessionState {
    /// Returns `true` while the session is doing work.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Stopped)
    }

    /// Returns `true` if the state implies an established link.
    #[must_use]
    pub fn has_link(&self) -> bool {
        matches!(self, Self::DiscoveringServices | Self::Polling(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Scanning => f.write_str("scanning"),
            Self::Connecting => f.write_str("connecting"),
            Self::DiscoveringServices => f.write_str("discovering services"),
            Self::Polling(phase) => write!(f, "polling ({phase})"),
            Self::Reconnecting => f.write_str("reconnecting"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// What the polling loop is doing right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollPhase {
    /// Waiting for the poll timer.
    Waiting,
    /// Writing the given setpoint.
    Writing(f32),
    /// Reading the setpoint.
    ReadingSetpoint,
    /// Reading the temperature.
    ReadingTemperature,
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Writing(value) => write!(f, "writing setpoint {value}"),
            Self::ReadingSetpoint => f.write_str("reading setpoint"),
            Self::ReadingTemperature => f.write_str("reading temperature"),
        }
    }
}
