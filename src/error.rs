// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `tempc` library.
//!
//! Failures fall into three groups: value validation on the consumer side,
//! transport failures reported by the Bluetooth backend, and payload or
//! configuration parsing.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred in the Bluetooth transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while parsing a payload or configuration.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The session task has exited and no longer accepts commands.
    #[error("session is closed")]
    SessionClosed,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A temperature is not a finite number or lies at or below absolute zero.
    #[error("temperature {0} is not a valid reading (must be finite and above -273)")]
    InvalidTemperature(f32),

    /// The history capacity must hold at least one sample.
    #[error("history capacity must be at least 1")]
    ZeroCapacity,
}

/// Errors reported by a [`Transport`](crate::transport::Transport).
///
/// The session classifies these: [`AdapterUnavailable`](Self::AdapterUnavailable)
/// and [`ScanFailed`](Self::ScanFailed) are fatal, [`Disconnected`](Self::Disconnected)
/// triggers a reconnect, everything else is retried in place.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No usable Bluetooth adapter is present or it is powered off.
    #[error("bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// The scan mechanism itself reported a failure.
    #[error("scan failed: {0}")]
    ScanFailed(String),

    /// Establishing the connection failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// Operation timed out.
    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    /// Service discovery could not be performed.
    #[error("service discovery failed: {0}")]
    DiscoveryFailed(String),

    /// The link to the device was lost.
    #[error("device disconnected")]
    Disconnected,

    /// The device or stack refused a read or write.
    #[error("operation refused: {0}")]
    Refused(String),

    /// Any other failure reported by the Bluetooth backend.
    #[cfg(feature = "btleplug")]
    #[error("bluetooth backend error: {0}")]
    Backend(String),
}

/// Errors related to parsing device payloads and configuration.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A characteristic value is shorter than the wire format requires.
    #[error("malformed payload: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        /// Number of bytes the format requires.
        expected: usize,
        /// Number of bytes actually received.
        actual: usize,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
