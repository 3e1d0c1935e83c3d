// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted in-memory transport for session tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;

use parking_lot::Mutex;
use tempc_lib::codec::{decode_f32_le, encode_f32_le};
use tempc_lib::config::GattLayout;
use tempc_lib::session::Attribute;
use tempc_lib::snapshot::StateSnapshot;
use tempc_lib::{DeviceIdentity, Readings, ResolvedService, Transport, TransportError};
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

pub const DEVICE_ADDRESS: &str = "C8:2B:96:A1:04:7E";

/// One call made against the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Scan,
    StopScan,
    Connect,
    Resolve,
    Read(Attribute),
    Write(f32),
    Disconnect,
}

#[derive(Debug)]
struct Device {
    temperature: f32,
    setpoint: f32,
    service_missing: bool,
    scans: VecDeque<Result<DeviceIdentity, TransportError>>,
    connects: VecDeque<Result<(), TransportError>>,
    temperature_reads: VecDeque<Result<Vec<u8>, TransportError>>,
    setpoint_reads: VecDeque<Result<Vec<u8>, TransportError>>,
    writes: VecDeque<Result<(), TransportError>>,
    calls: Vec<(Instant, Call)>,
    next_link: u32,
}

/// Fake thermostat. Unscripted calls succeed with the device's current values.
#[derive(Debug)]
pub struct FakeTransport {
    device: Mutex<Device>,
    /// Highest link the peripheral has dropped.
    dropped: watch::Sender<u32>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            device: Mutex::new(Device {
                temperature: 21.5,
                setpoint: 60.0,
                service_missing: false,
                scans: VecDeque::new(),
                connects: VecDeque::new(),
                temperature_reads: VecDeque::new(),
                setpoint_reads: VecDeque::new(),
                writes: VecDeque::new(),
                calls: Vec::new(),
                next_link: 1,
            }),
            dropped: watch::Sender::new(0),
        })
    }

    pub fn set_temperature(&self, value: f32) {
        self.device.lock().temperature = value;
    }

    pub fn setpoint(&self) -> f32 {
        self.device.lock().setpoint
    }

    pub fn without_service(&self) {
        self.device.lock().service_missing = true;
    }

    pub fn script_scan(&self, result: Result<DeviceIdentity, TransportError>) {
        self.device.lock().scans.push_back(result);
    }

    pub fn script_connect(&self, result: Result<(), TransportError>) {
        self.device.lock().connects.push_back(result);
    }

    pub fn script_temperature_read(&self, result: Result<Vec<u8>, TransportError>) {
        self.device.lock().temperature_reads.push_back(result);
    }

    pub fn script_write(&self, result: Result<(), TransportError>) {
        self.device.lock().writes.push_back(result);
    }

    /// Makes the peripheral drop every link opened so far.
    pub fn drop_link(&self) {
        let latest = self.device.lock().next_link - 1;
        self.dropped.send_replace(latest);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.device.lock().calls.iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.device.lock().calls.iter().filter(|(_, c)| c == call).count()
    }

    /// Times at which `call` was made.
    pub fn times(&self, call: &Call) -> Vec<Instant> {
        self.device
            .lock()
            .calls
            .iter()
            .filter(|(_, c)| c == call)
            .map(|(at, _)| *at)
            .collect()
    }

    fn record(&self, call: Call) {
        self.device.lock().calls.push((Instant::now(), call));
    }
}

pub fn device() -> DeviceIdentity {
    DeviceIdentity::new(DEVICE_ADDRESS).with_name("Tempc")
}

impl Transport for FakeTransport {
    type Link = u32;
    type Attribute = Attribute;

    async fn scan(&self, _device_name: &str) -> Result<DeviceIdentity, TransportError> {
        self.record(Call::Scan);
        self.device.lock().scans.pop_front().unwrap_or_else(|| Ok(device()))
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.record(Call::StopScan);
        Ok(())
    }

    async fn connect(&self, _device: &DeviceIdentity) -> Result<u32, TransportError> {
        self.record(Call::Connect);
        let mut device = self.device.lock();
        device.connects.pop_front().unwrap_or(Ok(()))?;
        let link = device.next_link;
        device.next_link += 1;
        Ok(link)
    }

    async fn resolve(
        &self,
        _link: &u32,
        _layout: &GattLayout,
    ) -> Result<Option<ResolvedService<Attribute>>, TransportError> {
        self.record(Call::Resolve);
        if self.device.lock().service_missing {
            return Ok(None);
        }
        Ok(Some(ResolvedService {
            temperature: Attribute::Temperature,
            setpoint: Attribute::Setpoint,
        }))
    }

    async fn read(&self, _link: &u32, attribute: &Attribute) -> Result<Vec<u8>, TransportError> {
        self.record(Call::Read(*attribute));
        let mut device = self.device.lock();
        match attribute {
            Attribute::Temperature => {
                let current = device.temperature;
                device
                    .temperature_reads
                    .pop_front()
                    .unwrap_or_else(|| Ok(encode_f32_le(current).to_vec()))
            }
            Attribute::Setpoint => {
                let current = device.setpoint;
                device
                    .setpoint_reads
                    .pop_front()
                    .unwrap_or_else(|| Ok(encode_f32_le(current).to_vec()))
            }
        }
    }

    async fn write(
        &self,
        _link: &u32,
        attribute: &Attribute,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        assert_eq!(*attribute, Attribute::Setpoint);
        let value = decode_f32_le(payload).unwrap();
        self.record(Call::Write(value));
        let mut device = self.device.lock();
        device.writes.pop_front().unwrap_or(Ok(()))?;
        device.setpoint = value;
        Ok(())
    }

    async fn disconnect(&self, _link: &u32) -> Result<(), TransportError> {
        self.record(Call::Disconnect);
        Ok(())
    }

    async fn disconnected(&self, link: &u32) {
        let mut dropped = self.dropped.subscribe();
        if dropped.wait_for(|latest| *latest >= *link).await.is_err() {
            pending::<()>().await;
        }
    }
}

/// Waits for the next readings snapshot, skipping status updates.
///
/// Panics on an error snapshot.
pub async fn next_readings(rx: &mut broadcast::Receiver<StateSnapshot>) -> Readings {
    loop {
        match rx.recv().await.unwrap() {
            StateSnapshot::Readings(readings) => return readings,
            StateSnapshot::Error(message) => panic!("unexpected error snapshot: {message}"),
            StateSnapshot::Status(_) => {}
        }
    }
}

/// Waits for the next error snapshot and returns its message.
pub async fn next_error(rx: &mut broadcast::Receiver<StateSnapshot>) -> String {
    loop {
        if let StateSnapshot::Error(message) = rx.recv().await.unwrap() {
            return message;
        }
    }
}
