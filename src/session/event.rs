// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events consumed by the session state machine.

use crate::error::TransportError;
use crate::types::{DeviceIdentity, Temperature};

/// One of the two thermostat characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Current temperature (read only).
    Temperature,
    /// Target temperature (read/write).
    Setpoint,
}

/// Timers the session schedules. At most one is pending at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Retry a failed connection attempt.
    Connect,
    /// Retry a failed service discovery.
    Discover,
    /// Reconnect after the link dropped.
    Reconnect,
    /// Run the next polling cycle.
    Poll,
}

/// Outcome of a service discovery that reached the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLookup {
    /// The service and both characteristics are present.
    Found,
    /// The peripheral does not expose the thermostat service.
    Missing,
}

/// Input to [`SessionMachine::handle`](super::SessionMachine::handle).
///
/// Consumer commands and transport outcomes share one queue so that every
/// transition is serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Consumer asked to begin or resume the session.
    Start,
    /// Consumer asked to halt. History and the bound device are kept.
    Stop,
    /// Consumer asked for a full reset. History and the bound device are dropped.
    Reset,
    /// Consumer asked for a new target temperature.
    SetpointRequested(Temperature),
    /// The scan finished.
    ScanResult(Result<DeviceIdentity, TransportError>),
    /// A connection attempt finished.
    Connected(Result<(), TransportError>),
    /// Service discovery finished.
    ServicesResolved(Result<ServiceLookup, TransportError>),
    /// A characteristic read finished.
    CharacteristicRead {
        /// Characteristic that was read.
        attribute: Attribute,
        /// Raw payload or the failure.
        result: Result<Vec<u8>, TransportError>,
    },
    /// A characteristic write finished.
    CharacteristicWritten {
        /// Characteristic that was written.
        attribute: Attribute,
        /// Acknowledgment or the failure.
        result: Result<(), TransportError>,
    },
    /// The transport reported the link as lost.
    Disconnected,
    /// A scheduled timer elapsed.
    TimerFired(Timer),
}

impl SessionEvent {
    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::SetpointRequested(_) => "setpoint_requested",
            Self::ScanResult(_) => "scan_result",
            Self::Connected(_) => "connected",
            Self::ServicesResolved(_) => "services_resolved",
            Self::CharacteristicRead { .. } => "characteristic_read",
            Self::CharacteristicWritten { .. } => "characteristic_written",
            Self::Disconnected => "disconnected",
            Self::TimerFired(_) => "timer_fired",
        }
    }
}
