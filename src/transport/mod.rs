// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GATT transport abstraction.
//!
//! The session drives a device exclusively through the [`Transport`] trait.
//! Implementations wrap a concrete Bluetooth stack; the `btleplug` feature
//! provides [`BtleTransport`].
//!
//! Every operation is a single request with a single outcome. The session
//! never issues two operations at once, and it drops the returned future to
//! cancel one. Link loss is reported separately through
//! [`Transport::disconnected`], which the session watches while a link is
//! open.

#[cfg(feature = "btleplug")]
mod btle;

#[cfg(feature = "btleplug")]
pub use btle::BtleTransport;

use std::future::Future;

use crate::config::GattLayout;
use crate::error::TransportError;
use crate::types::DeviceIdentity;

/// Characteristic handles resolved from the thermostat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService<A> {
    /// Handle of the current temperature characteristic.
    pub temperature: A,
    /// Handle of the target temperature characteristic.
    pub setpoint: A,
}

/// A GATT-capable Bluetooth stack.
///
/// # Errors
///
/// Implementations report failures as [`TransportError`]. The session
/// treats [`TransportError::AdapterUnavailable`] as fatal in every phase,
/// [`TransportError::ScanFailed`] as fatal while scanning, and
/// [`TransportError::Disconnected`] as a lost link. Any other error is
/// retried after the configured delay.
pub trait Transport: Send + Sync + 'static {
    /// Connection handle to a peripheral.
    type Link: Clone + Send + Sync + 'static;

    /// Resolved characteristic handle.
    type Attribute: Clone + Send + Sync + 'static;

    /// Scans until a peripheral advertising `device_name` is found.
    fn scan(
        &self,
        device_name: &str,
    ) -> impl Future<Output = Result<DeviceIdentity, TransportError>> + Send;

    /// Stops a scan started by [`scan`](Self::scan). Must succeed when idle.
    fn stop_scan(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Connects to a previously discovered peripheral.
    fn connect(
        &self,
        device: &DeviceIdentity,
    ) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;

    /// Discovers services and resolves the thermostat characteristics.
    ///
    /// Returns `Ok(None)` when the service or either characteristic is
    /// missing, which marks the peripheral as incompatible.
    fn resolve(
        &self,
        link: &Self::Link,
        layout: &GattLayout,
    ) -> impl Future<Output = Result<Option<ResolvedService<Self::Attribute>>, TransportError>> + Send;

    /// Reads a characteristic value.
    fn read(
        &self,
        link: &Self::Link,
        attribute: &Self::Attribute,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Writes a characteristic value and waits for the acknowledgment.
    fn write(
        &self,
        link: &Self::Link,
        attribute: &Self::Attribute,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the connection.
    fn disconnect(&self, link: &Self::Link) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Resolves once the peripheral behind `link` drops the connection.
    ///
    /// Returns immediately if the link is already down. Never resolves for a
    /// healthy link, so implementations that cannot observe link loss may
    /// simply pend forever.
    fn disconnected(&self, link: &Self::Link) -> impl Future<Output = ()> + Send;
}
