// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot types delivered to consumers.

use chrono::{DateTime, Utc};

use crate::history::RingView;

/// Externally visible state of a session.
///
/// Snapshots are immutable. One is produced for each transition worth
/// reporting; retries are never reported.
#[derive(Debug, Clone, PartialEq)]
pub enum StateSnapshot {
    /// Progress message such as "Scanning" or "Connecting to ...".
    Status(String),
    /// Fatal failure. The session has stopped and must be restarted.
    Error(String),
    /// Fresh temperature reading with the accumulated history.
    Readings(Readings),
}

impl StateSnapshot {
    /// Creates a status snapshot.
    #[must_use]
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status(message.into())
    }

    /// Creates an error snapshot.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Returns the status or error message, if this snapshot carries one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Status(message) | Self::Error(message) => Some(message),
            Self::Readings(_) => None,
        }
    }

    /// Returns `true` for error snapshots.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the readings, if this snapshot carries them.
    #[must_use]
    pub fn readings(&self) -> Option<&Readings> {
        match self {
            Self::Readings(readings) => Some(readings),
            Self::Status(_) | Self::Error(_) => None,
        }
    }
}

/// Temperature data attached to a [`StateSnapshot::Readings`].
#[derive(Debug, Clone, PartialEq)]
pub struct Readings {
    /// Sample history at the time of the reading.
    pub history: RingView,
    /// The temperature just read, in degrees Celsius.
    pub temperature: f32,
    /// The device's target temperature, if known.
    pub setpoint: Option<f32>,
    /// Wall-clock time the snapshot was built.
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_accessor() {
        assert_eq!(StateSnapshot::status("Scanning").message(), Some("Scanning"));
        assert_eq!(
            StateSnapshot::error("Service not found").message(),
            Some("Service not found")
        );
    }

    #[test]
    fn only_error_is_error() {
        assert!(StateSnapshot::error("boom").is_error());
        assert!(!StateSnapshot::status("Reading").is_error());
    }
}
