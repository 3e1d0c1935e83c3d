// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session configuration.
//!
//! Defaults match the Tempc firmware: advertised name `Tempc`, one primary
//! service with a temperature and a setpoint characteristic, and the retry
//! cadence the device was tuned for.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;
use crate::history::DEFAULT_CAPACITY;

/// Advertised local name of the thermostat.
pub const DEFAULT_DEVICE_NAME: &str = "Tempc";

/// Primary service exposed by the thermostat.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x19b1_0010_e8f2_537e_4f6c_d104_768a_1214);

/// Read-only characteristic holding the current temperature.
pub const TEMPERATURE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x19b1_0011_e8f2_537e_4f6c_d104_768a_1214);

/// Read/write characteristic holding the target temperature.
pub const SETPOINT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x19b1_0012_e8f2_537e_4f6c_d104_768a_1214);

/// Configuration for a device session.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tempc_lib::config::{RetryPolicy, SessionConfig};
///
/// let config = SessionConfig::default()
///     .with_device_name("Tempc-2")
///     .with_history_capacity(120)
///     .with_timing(RetryPolicy::default().with_poll_interval(Duration::from_secs(2)));
///
/// assert_eq!(config.device_name, "Tempc-2");
/// assert_eq!(config.timing.poll_interval, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Advertised name a peripheral must carry to be bound.
    pub device_name: String,
    /// Service and characteristic identifiers.
    pub gatt: GattLayout,
    /// Number of samples kept in the history ring.
    pub history_capacity: usize,
    /// Retry and polling intervals.
    pub timing: RetryPolicy,
}

impl SessionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the document is not valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use tempc_lib::config::SessionConfig;
    ///
    /// let config = SessionConfig::from_json(r#"{"timing": {"poll_interval": 2000}}"#).unwrap();
    /// assert_eq!(config.timing.poll_interval, Duration::from_secs(2));
    /// assert_eq!(config.device_name, "Tempc");
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Sets the advertised name to scan for.
    #[must_use]
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Sets the GATT identifiers.
    #[must_use]
    pub fn with_gatt(mut self, gatt: GattLayout) -> Self {
        self.gatt = gatt;
        self
    }

    /// Sets the history capacity.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Sets the retry and polling intervals.
    #[must_use]
    pub fn with_timing(mut self, timing: RetryPolicy) -> Self {
        self.timing = timing;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            gatt: GattLayout::default(),
            history_capacity: DEFAULT_CAPACITY,
            timing: RetryPolicy::default(),
        }
    }
}

/// GATT identifiers the session resolves after connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GattLayout {
    /// Primary service.
    pub service: Uuid,
    /// Current temperature characteristic.
    pub temperature: Uuid,
    /// Target temperature characteristic.
    pub setpoint: Uuid,
}

impl Default for GattLayout {
    fn default() -> Self {
        Self {
            service: SERVICE_UUID,
            temperature: TEMPERATURE_CHARACTERISTIC_UUID,
            setpoint: SETPOINT_CHARACTERISTIC_UUID,
        }
    }
}

/// Fixed retry and cadence intervals.
///
/// Every delay is constant; there is no backoff. Durations serialize as
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before retrying a failed connection attempt.
    #[serde(with = "duration_ms")]
    pub connect_retry: Duration,
    /// Delay before retrying a failed service discovery.
    #[serde(with = "duration_ms")]
    pub discovery_retry: Duration,
    /// Delay between losing the link and reconnecting.
    #[serde(with = "duration_ms")]
    pub reconnect_delay: Duration,
    /// Delay between successful reads.
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    /// Delay before retrying a failed read or write.
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,
    /// Age after which the setpoint is read from the device again.
    #[serde(with = "duration_ms")]
    pub setpoint_refresh: Duration,
    /// Upper bound for a single connect, discovery, read or write.
    #[serde(with = "duration_ms")]
    pub operation_timeout: Duration,
}

impl RetryPolicy {
    /// Sets the connection retry delay.
    #[must_use]
    pub fn with_connect_retry(mut self, delay: Duration) -> Self {
        self.connect_retry = delay;
        self
    }

    /// Sets the discovery retry delay.
    #[must_use]
    pub fn with_discovery_retry(mut self, delay: Duration) -> Self {
        self.discovery_retry = delay;
        self
    }

    /// Sets the reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the read/write retry delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the setpoint refresh age.
    #[must_use]
    pub fn with_setpoint_refresh(mut self, age: Duration) -> Self {
        self.setpoint_refresh = age;
        self
    }

    /// Sets the connect/discovery timeout.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_retry: Duration::from_secs(1),
            discovery_retry: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
            retry_delay: Duration::from_secs(5),
            setpoint_refresh: Duration::from_secs(10 * 60),
            operation_timeout: Duration::from_secs(10),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        // Safe: configured intervals are far below u64::MAX milliseconds
        #[allow(clippy::cast_possible_truncation)]
        let millis = value.as_millis() as u64;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SessionConfig::default();

        assert_eq!(config.device_name, "Tempc");
        assert_eq!(config.history_capacity, 400);
        assert_eq!(
            config.gatt.service.to_string(),
            "19b10010-e8f2-537e-4f6c-d104768a1214"
        );
        assert_eq!(
            config.gatt.temperature.to_string(),
            "19b10011-e8f2-537e-4f6c-d104768a1214"
        );
        assert_eq!(
            config.gatt.setpoint.to_string(),
            "19b10012-e8f2-537e-4f6c-d104768a1214"
        );
    }

    #[test]
    fn default_timing() {
        let timing = RetryPolicy::default();

        assert_eq!(timing.connect_retry, Duration::from_secs(1));
        assert_eq!(timing.discovery_retry, Duration::from_secs(1));
        assert_eq!(timing.reconnect_delay, Duration::from_secs(1));
        assert_eq!(timing.poll_interval, Duration::from_secs(5));
        assert_eq!(timing.retry_delay, Duration::from_secs(5));
        assert_eq!(timing.setpoint_refresh, Duration::from_secs(600));
    }

    #[test]
    fn json_round_trip_uses_milliseconds() {
        let config = SessionConfig::default()
            .with_timing(RetryPolicy::default().with_retry_delay(Duration::from_millis(750)));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timing"]["retry_delay"], 750);

        let parsed = SessionConfig::from_json(&json.to_string()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SessionConfig::from_json(r#"{"device_name": "Lab"}"#).unwrap();

        assert_eq!(config.device_name, "Lab");
        assert_eq!(config.timing, RetryPolicy::default());
        assert_eq!(config.gatt, GattLayout::default());
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = SessionConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }
}
