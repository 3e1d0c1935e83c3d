// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identity of a discovered peripheral.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to the discovered remote device.
///
/// Bound once by the scan and reused verbatim for every reconnect until the
/// session is reset.
///
/// # Examples
///
/// ```
/// use tempc_lib::types::DeviceIdentity;
///
/// let device = DeviceIdentity::new("C8:2B:96:A1:04:7E").with_name("Tempc");
/// assert_eq!(device.address(), "C8:2B:96:A1:04:7E");
/// assert_eq!(device.to_string(), "Tempc (C8:2B:96:A1:04:7E)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    address: String,
    name: Option<String>,
}

impl DeviceIdentity {
    /// Creates an identity from the peripheral address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Attaches the advertised local name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the peripheral address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the advertised name, if one was seen.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({})", self.address),
            None => f.write_str(&self.address),
        }
    }
}
