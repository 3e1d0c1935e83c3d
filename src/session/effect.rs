// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Side effects requested by the session state machine.

use std::time::Duration;

use crate::codec::PAYLOAD_LEN;
use crate::snapshot::StateSnapshot;
use crate::types::DeviceIdentity;

use super::{Attribute, Timer};

/// Work the driver performs on behalf of the machine, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start scanning for the configured device name.
    StartScan,
    /// Tell the stack to stop scanning.
    StopScan,
    /// Connect to the bound device.
    Connect(DeviceIdentity),
    /// Resolve the thermostat service on the current link.
    DiscoverServices,
    /// Read a characteristic.
    Read(Attribute),
    /// Write an encoded value to a characteristic.
    Write {
        /// Target characteristic.
        attribute: Attribute,
        /// Encoded payload.
        payload: [u8; PAYLOAD_LEN],
    },
    /// Close and forget the current link.
    Disconnect,
    /// Arm the timer, replacing any pending one.
    Schedule {
        /// Which timer to fire.
        timer: Timer,
        /// Delay from now.
        after: Duration,
    },
    /// Disarm the pending timer.
    CancelTimer,
    /// Abandon the in-flight transport operation.
    CancelOperation,
    /// Deliver a snapshot to the consumer.
    Emit(StateSnapshot),
}

impl Effect {
    /// Returns the snapshot if this is an [`Effect::Emit`].
    #[must_use]
    pub fn snapshot(&self) -> Option<&StateSnapshot> {
        match self {
            Self::Emit(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}
