// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device session state machine.
//!
//! [`SessionMachine::handle`] is a pure transition: it takes the current
//! state and one [`SessionEvent`] and returns the [`Effect`]s the driver must
//! carry out. It performs no I/O and reads no clock, which keeps every retry
//! path testable without a device.
//!
//! Failures are classified here:
//!
//! - scan failure, missing service, unavailable adapter: fatal, one error
//!   snapshot, session stops
//! - connect, discovery, read and write failures: retried after a fixed delay,
//!   never reported as errors
//! - lost link: reconnect to the same device without scanning again
//! - short payloads and sentinel readings: ignored, step retried after the
//!   fixed delay

use std::time::Duration;

use tokio::time::Instant;

use crate::codec::{decode_f32_le, encode_f32_le};
use crate::config::{RetryPolicy, SessionConfig};
use crate::error::{TransportError, ValueError};
use crate::history::SampleRing;
use crate::snapshot::SnapshotEmitter;
use crate::types::{DeviceIdentity, is_valid_reading};

use super::setpoint::{Setpoint, SetpointInbox};
use super::{Attribute, Effect, PollPhase, ServiceLookup, SessionEvent, SessionState, Timer};

/// Status shown while scanning.
pub const STATUS_SCANNING: &str = "Scanning";
/// Status shown while resolving the service.
pub const STATUS_DISCOVERING: &str = "Discovering services";
/// Status shown once polling begins.
pub const STATUS_READING: &str = "Reading";
/// Error shown when the peripheral lacks the thermostat service.
pub const ERROR_SERVICE_NOT_FOUND: &str = "Service not found";

/// State machine for one thermostat session.
#[derive(Debug)]
pub struct SessionMachine {
    timing: RetryPolicy,
    state: SessionState,
    device: Option<DeviceIdentity>,
    ring: SampleRing,
    setpoint: Setpoint,
    inbox: SetpointInbox,
    temperature: Option<f32>,
}

impl SessionMachine {
    /// Creates an idle machine.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::ZeroCapacity` if the configured history capacity is 0.
    pub fn new(config: &SessionConfig) -> Result<Self, ValueError> {
        Ok(Self {
            timing: config.timing,
            state: SessionState::Idle,
            device: None,
            ring: SampleRing::new(config.history_capacity)?,
            setpoint: Setpoint::unknown(),
            inbox: SetpointInbox::default(),
            temperature: None,
        })
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the bound device.
    #[must_use]
    pub fn device(&self) -> Option<&DeviceIdentity> {
        self.device.as_ref()
    }

    /// Returns the sample history.
    #[must_use]
    pub fn history(&self) -> &SampleRing {
        &self.ring
    }

    /// Returns the last known setpoint.
    #[must_use]
    pub fn setpoint(&self) -> &Setpoint {
        &self.setpoint
    }

    /// Returns the setpoint waiting to be written.
    #[must_use]
    pub fn pending_setpoint(&self) -> Option<f32> {
        self.inbox.peek()
    }

    /// Returns the temperature read on the current link.
    #[must_use]
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Applies one event and returns the effects to carry out, in order.
    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Vec<Effect> {
        tracing::trace!(state = %self.state, event = event.kind(), "Handling session event");

        match event {
            SessionEvent::Start => self.on_start(),
            SessionEvent::Stop => self.on_stop(),
            SessionEvent::Reset => self.on_reset(),
            SessionEvent::SetpointRequested(target) => {
                tracing::debug!(setpoint = %target, "Setpoint requested");
                self.inbox.request(target.celsius());
                self.setpoint.stage(target.celsius());
                Vec::new()
            }
            SessionEvent::ScanResult(result) => self.on_scan_result(result),
            SessionEvent::Connected(result) => self.on_connected(result),
            SessionEvent::ServicesResolved(result) => self.on_services_resolved(result, now),
            SessionEvent::CharacteristicRead { attribute, result } => {
                self.on_read(attribute, result, now)
            }
            SessionEvent::CharacteristicWritten { attribute, result } => {
                self.on_written(attribute, result, now)
            }
            SessionEvent::Disconnected => self.on_disconnected(),
            SessionEvent::TimerFired(timer) => self.on_timer(timer, now),
        }
    }

    // =========================================================================
    // Consumer commands
    // =========================================================================

    fn on_start(&mut self) -> Vec<Effect> {
        if self.state.is_active() {
            tracing::debug!(state = %self.state, "Session already running");
            return Vec::new();
        }
        if self.device.is_some() {
            self.enter_connecting()
        } else {
            self.enter_scanning()
        }
    }

    fn on_stop(&mut self) -> Vec<Effect> {
        if !self.state.is_active() {
            self.clear_caches();
            return Vec::new();
        }
        tracing::info!(state = %self.state, "Stopping session");
        let effects = self.teardown();
        self.state = SessionState::Stopped;
        effects
    }

    fn on_reset(&mut self) -> Vec<Effect> {
        tracing::info!(state = %self.state, "Resetting session");
        let effects = if self.state.is_active() {
            self.teardown()
        } else {
            self.clear_caches();
            Vec::new()
        };
        self.ring.clear();
        self.device = None;
        self.state = SessionState::Idle;
        effects
    }

    // =========================================================================
    // Transport outcomes
    // =========================================================================

    fn on_scan_result(&mut self, result: Result<DeviceIdentity, TransportError>) -> Vec<Effect> {
        if self.state != SessionState::Scanning {
            return self.ignored("scan_result");
        }
        match result {
            Ok(device) => {
                tracing::info!(device = %device, "Found device");
                self.device = Some(device);
                let mut effects = vec![Effect::StopScan];
                effects.extend(self.enter_connecting());
                effects
            }
            Err(TransportError::AdapterUnavailable(reason)) => self.adapter_unavailable(&reason),
            Err(TransportError::ScanFailed(reason)) => self.fail(format!("Scan failed: {reason}")),
            Err(err) => self.fail(format!("Scan failed: {err}")),
        }
    }

    fn on_connected(&mut self, result: Result<(), TransportError>) -> Vec<Effect> {
        if self.state != SessionState::Connecting {
            // A link nobody is waiting for must not leak
            return if result.is_ok() {
                tracing::debug!(state = %self.state, "Dropping unexpected link");
                vec![Effect::Disconnect]
            } else {
                self.ignored("connected")
            };
        }
        match result {
            Ok(()) => {
                tracing::info!("Connected");
                self.state = SessionState::DiscoveringServices;
                vec![
                    Effect::Emit(SnapshotEmitter::status(STATUS_DISCOVERING)),
                    Effect::DiscoverServices,
                ]
            }
            Err(TransportError::AdapterUnavailable(reason)) => self.adapter_unavailable(&reason),
            Err(err) => {
                tracing::warn!(error = %err, "Connection attempt failed, retrying");
                vec![self.schedule(Timer::Connect, self.timing.connect_retry)]
            }
        }
    }

    fn on_services_resolved(
        &mut self,
        result: Result<ServiceLookup, TransportError>,
        now: Instant,
    ) -> Vec<Effect> {
        if self.state != SessionState::DiscoveringServices {
            return self.ignored("services_resolved");
        }
        match result {
            Ok(ServiceLookup::Found) => {
                tracing::info!("Thermostat service resolved");
                let mut effects = vec![Effect::Emit(SnapshotEmitter::status(STATUS_READING))];
                effects.extend(self.cycle(now));
                effects
            }
            Ok(ServiceLookup::Missing) => {
                tracing::error!("Thermostat service not found on device");
                self.fail(ERROR_SERVICE_NOT_FOUND.to_string())
            }
            Err(TransportError::Disconnected) => self.on_disconnected(),
            Err(TransportError::AdapterUnavailable(reason)) => self.adapter_unavailable(&reason),
            Err(err) => {
                tracing::warn!(error = %err, "Service discovery failed, retrying");
                vec![self.schedule(Timer::Discover, self.timing.discovery_retry)]
            }
        }
    }

    fn on_read(
        &mut self,
        attribute: Attribute,
        result: Result<Vec<u8>, TransportError>,
        now: Instant,
    ) -> Vec<Effect> {
        let expected = match self.state {
            SessionState::Polling(PollPhase::ReadingTemperature) => Attribute::Temperature,
            SessionState::Polling(PollPhase::ReadingSetpoint) => Attribute::Setpoint,
            _ => return self.ignored("characteristic_read"),
        };
        if attribute != expected {
            return self.ignored("characteristic_read");
        }

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => return self.on_operation_failed(attribute, err),
        };
        let value = match decode_f32_le(&bytes) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(?attribute, error = %err, "Ignoring malformed payload");
                return self.wait(self.timing.retry_delay);
            }
        };

        match attribute {
            Attribute::Temperature => {
                if !is_valid_reading(value) {
                    tracing::debug!(value, "Device has no temperature reading yet");
                    return self.wait(self.timing.retry_delay);
                }
                tracing::debug!(temperature = value, "Temperature read");
                self.ring.push(value, now);
                self.temperature = Some(value);
                let snapshot = SnapshotEmitter::readings(&self.ring, value, self.setpoint.raw());
                let mut effects = vec![Effect::Emit(snapshot)];
                effects.extend(self.wait(self.timing.poll_interval));
                effects
            }
            Attribute::Setpoint => {
                tracing::debug!(setpoint = value, "Setpoint read");
                self.setpoint.confirm(value, now);
                self.wait(self.timing.poll_interval)
            }
        }
    }

    fn on_written(
        &mut self,
        attribute: Attribute,
        result: Result<(), TransportError>,
        now: Instant,
    ) -> Vec<Effect> {
        let SessionState::Polling(PollPhase::Writing(value)) = self.state else {
            return self.ignored("characteristic_written");
        };
        if attribute != Attribute::Setpoint {
            return self.ignored("characteristic_written");
        }

        match result {
            Ok(()) => {
                tracing::info!(setpoint = value, "Setpoint written");
                self.inbox.acknowledge(value);
                self.setpoint.confirm(value, now);
                self.cycle(now)
            }
            Err(err) => self.on_operation_failed(attribute, err),
        }
    }

    fn on_operation_failed(&mut self, attribute: Attribute, err: TransportError) -> Vec<Effect> {
        match err {
            TransportError::Disconnected => self.on_disconnected(),
            TransportError::AdapterUnavailable(reason) => self.adapter_unavailable(&reason),
            err => {
                tracing::warn!(?attribute, error = %err, "Characteristic operation failed, retrying");
                self.wait(self.timing.retry_delay)
            }
        }
    }

    fn on_disconnected(&mut self) -> Vec<Effect> {
        if !self.state.has_link() {
            return self.ignored("disconnected");
        }
        tracing::warn!(state = %self.state, "Link lost, reconnecting");
        self.temperature = None;
        self.state = SessionState::Reconnecting;
        vec![
            Effect::CancelTimer,
            Effect::CancelOperation,
            Effect::Disconnect,
            self.schedule(Timer::Reconnect, self.timing.reconnect_delay),
        ]
    }

    fn on_timer(&mut self, timer: Timer, now: Instant) -> Vec<Effect> {
        match (timer, self.state) {
            (Timer::Connect, SessionState::Connecting)
            | (Timer::Reconnect, SessionState::Reconnecting) => self.enter_connecting(),
            (Timer::Discover, SessionState::DiscoveringServices) => vec![Effect::DiscoverServices],
            (Timer::Poll, SessionState::Polling(PollPhase::Waiting)) => self.cycle(now),
            _ => self.ignored("timer_fired"),
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn enter_scanning(&mut self) -> Vec<Effect> {
        tracing::info!("Scanning for device");
        self.state = SessionState::Scanning;
        vec![
            Effect::Emit(SnapshotEmitter::status(STATUS_SCANNING)),
            Effect::StartScan,
        ]
    }

    fn enter_connecting(&mut self) -> Vec<Effect> {
        let Some(device) = self.device.clone() else {
            return self.enter_scanning();
        };
        tracing::debug!(device = %device, "Connecting");
        self.state = SessionState::Connecting;
        self.temperature = None;
        self.setpoint.invalidate();
        vec![
            Effect::Emit(SnapshotEmitter::status(format!(
                "Connecting to {}",
                device.address()
            ))),
            Effect::Connect(device),
        ]
    }

    /// Picks the next polling action: pending write, then stale setpoint,
    /// then temperature.
    fn cycle(&mut self, now: Instant) -> Vec<Effect> {
        if let Some(value) = self.inbox.peek() {
            self.state = SessionState::Polling(PollPhase::Writing(value));
            return vec![Effect::Write {
                attribute: Attribute::Setpoint,
                payload: encode_f32_le(value),
            }];
        }
        if self.setpoint.needs_refresh(now, self.timing.setpoint_refresh) {
            self.state = SessionState::Polling(PollPhase::ReadingSetpoint);
            return vec![Effect::Read(Attribute::Setpoint)];
        }
        self.state = SessionState::Polling(PollPhase::ReadingTemperature);
        vec![Effect::Read(Attribute::Temperature)]
    }

    fn wait(&mut self, delay: Duration) -> Vec<Effect> {
        self.state = SessionState::Polling(PollPhase::Waiting);
        vec![self.schedule(Timer::Poll, delay)]
    }

    fn schedule(&self, timer: Timer, after: Duration) -> Effect {
        tracing::trace!(?timer, delay_ms = after.as_millis(), "Scheduling timer");
        Effect::Schedule { timer, after }
    }

    fn adapter_unavailable(&mut self, reason: &str) -> Vec<Effect> {
        self.fail(format!("Bluetooth adapter unavailable: {reason}"))
    }

    /// Stops the session and reports a fatal error.
    fn fail(&mut self, message: String) -> Vec<Effect> {
        tracing::error!(state = %self.state, message = %message, "Session failed");
        let mut effects = self.teardown();
        self.state = SessionState::Stopped;
        effects.push(Effect::Emit(SnapshotEmitter::error(message)));
        effects
    }

    /// Releases everything the current state holds. History and the bound
    /// device survive.
    fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::CancelTimer, Effect::CancelOperation];
        if self.state == SessionState::Scanning {
            effects.push(Effect::StopScan);
        }
        if self.state.has_link() {
            effects.push(Effect::Disconnect);
        }
        self.clear_caches();
        effects
    }

    fn clear_caches(&mut self) {
        self.temperature = None;
        self.setpoint.invalidate();
        self.inbox.clear();
    }

    fn ignored(&self, event: &'static str) -> Vec<Effect> {
        tracing::debug!(state = %self.state, event, "Event does not apply to current state, ignoring");
        Vec::new()
    }
}
