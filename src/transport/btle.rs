// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`Transport`] backed by the host Bluetooth stack through `btleplug`.

use std::future::pending;

use btleplug::api::{
    Central as _, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;

use crate::config::GattLayout;
use crate::error::TransportError;
use crate::types::DeviceIdentity;

use super::{ResolvedService, Transport};

/// Bluetooth LE transport using one local adapter.
///
/// Peripherals are identified by their Bluetooth address, so a session can
/// reconnect to the device it found without scanning again.
#[derive(Debug, Clone)]
pub struct BtleTransport {
    adapter: Adapter,
}

impl BtleTransport {
    /// Wraps an adapter obtained from a `btleplug` manager.
    #[must_use]
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Opens the first Bluetooth adapter of the host.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AdapterUnavailable`] if the host has no
    /// adapter or the stack cannot be reached.
    pub async fn first_adapter() -> Result<Self, TransportError> {
        let manager = Manager::new().await.map_err(adapter_error)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(adapter_error)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                TransportError::AdapterUnavailable("no bluetooth adapter found".to_string())
            })?;

        if let Ok(info) = adapter.adapter_info().await {
            tracing::info!(adapter = %info, "Using bluetooth adapter");
        }

        Ok(Self::new(adapter))
    }

    async fn find_named(&self, device_name: &str) -> Result<Option<DeviceIdentity>, TransportError> {
        let peripherals = self.adapter.peripherals().await.map_err(scan_error)?;
        for peripheral in &peripherals {
            if let Some(identity) = identify(peripheral, device_name).await {
                return Ok(Some(identity));
            }
        }
        Ok(None)
    }

    async fn find_by_address(&self, address: &str) -> Result<Peripheral, TransportError> {
        self.adapter
            .peripherals()
            .await
            .map_err(map_error)?
            .into_iter()
            .find(|p| p.address().to_string() == address)
            .ok_or_else(|| TransportError::ConnectFailed(format!("{address} is not known to the adapter")))
    }
}

impl Transport for BtleTransport {
    type Link = Peripheral;
    type Attribute = Characteristic;

    async fn scan(&self, device_name: &str) -> Result<DeviceIdentity, TransportError> {
        let mut events = self.adapter.events().await.map_err(scan_error)?;
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(scan_error)?;

        // A peripheral seen by an earlier scan may not be announced again
        if let Some(identity) = self.find_named(device_name).await? {
            return Ok(identity);
        }

        while let Some(event) = events.next().await {
            if let CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) = event {
                let Ok(peripheral) = self.adapter.peripheral(&id).await else {
                    continue;
                };
                if let Some(identity) = identify(&peripheral, device_name).await {
                    return Ok(identity);
                }
            }
        }

        Err(TransportError::ScanFailed(
            "adapter event stream closed".to_string(),
        ))
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.adapter.stop_scan().await.map_err(map_error)
    }

    async fn connect(&self, device: &DeviceIdentity) -> Result<Peripheral, TransportError> {
        let peripheral = self.find_by_address(device.address()).await?;
        tracing::debug!(device = %device, "Opening link");
        peripheral.connect().await.map_err(connect_error)?;
        Ok(peripheral)
    }

    async fn resolve(
        &self,
        link: &Peripheral,
        layout: &GattLayout,
    ) -> Result<Option<ResolvedService<Characteristic>>, TransportError> {
        link.discover_services().await.map_err(discovery_error)?;

        let Some(service) = link.services().into_iter().find(|s| s.uuid == layout.service) else {
            return Ok(None);
        };
        let find = |uuid| {
            service
                .characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
        };

        Ok(find(layout.temperature)
            .zip(find(layout.setpoint))
            .map(|(temperature, setpoint)| ResolvedService {
                temperature,
                setpoint,
            }))
    }

    async fn read(&self, link: &Peripheral, attribute: &Characteristic) -> Result<Vec<u8>, TransportError> {
        link.read(attribute).await.map_err(map_error)
    }

    async fn write(
        &self,
        link: &Peripheral,
        attribute: &Characteristic,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        link.write(attribute, payload, WriteType::WithResponse)
            .await
            .map_err(map_error)
    }

    async fn disconnect(&self, link: &Peripheral) -> Result<(), TransportError> {
        link.disconnect().await.map_err(map_error)
    }

    async fn disconnected(&self, link: &Peripheral) {
        let mut events = match self.adapter.events().await {
            Ok(events) => events,
            Err(err) => {
                tracing::warn!(error = %err, "Cannot watch link state, relying on operation errors");
                return pending().await;
            }
        };
        // Subscribed first so a drop between the two calls is not missed
        if !link.is_connected().await.unwrap_or(false) {
            return;
        }

        let id = link.id();
        while let Some(event) = events.next().await {
            if matches!(event, CentralEvent::DeviceDisconnected(ref lost) if *lost == id) {
                tracing::debug!(address = %link.address(), "Peripheral dropped the link");
                return;
            }
        }

        tracing::warn!("Adapter event stream closed while watching link");
        pending().await
    }
}

/// Returns the identity of `peripheral` if it advertises `device_name`.
async fn identify(peripheral: &Peripheral, device_name: &str) -> Option<DeviceIdentity> {
    let properties = peripheral.properties().await.ok()??;
    let name = properties.local_name?;
    (name == device_name).then(|| DeviceIdentity::new(properties.address.to_string()).with_name(name))
}

fn map_error(err: btleplug::Error) -> TransportError {
    match err {
        btleplug::Error::NotConnected => TransportError::Disconnected,
        btleplug::Error::PermissionDenied => {
            TransportError::AdapterUnavailable("permission denied".to_string())
        }
        btleplug::Error::TimedOut(elapsed) => {
            #[allow(clippy::cast_possible_truncation)]
            let elapsed_ms = elapsed.as_millis() as u64;
            TransportError::Timeout(elapsed_ms)
        }
        btleplug::Error::NotSupported(reason) => TransportError::Refused(reason),
        other => TransportError::Backend(other.to_string()),
    }
}

fn adapter_error(err: btleplug::Error) -> TransportError {
    TransportError::AdapterUnavailable(err.to_string())
}

fn scan_error(err: btleplug::Error) -> TransportError {
    match err {
        btleplug::Error::PermissionDenied => map_error(err),
        other => TransportError::ScanFailed(other.to_string()),
    }
}

fn connect_error(err: btleplug::Error) -> TransportError {
    match err {
        btleplug::Error::PermissionDenied | btleplug::Error::TimedOut(_) => map_error(err),
        other => TransportError::ConnectFailed(other.to_string()),
    }
}

fn discovery_error(err: btleplug::Error) -> TransportError {
    match err {
        btleplug::Error::NotConnected | btleplug::Error::PermissionDenied => map_error(err),
        other => TransportError::DiscoveryFailed(other.to_string()),
    }
}
