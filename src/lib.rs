// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `Tempc` Lib - A Rust client for the Tempc Bluetooth LE thermostat.
//!
//! This library finds a Tempc thermostat by its advertised name, keeps a
//! connection to it, polls the current temperature and pushes new target
//! temperatures. It survives link loss by reconnecting to the same device
//! and keeps a fixed-size history of readings across reconnects.
//!
//! # Supported Features
//!
//! - **Discovery**: name-filtered scan, first match is bound
//! - **Polling**: temperature every 5 s, setpoint refreshed every 10 min
//! - **Setpoint control**: last request wins, written on the next cycle
//! - **History**: 400-sample ring with per-sample elapsed time
//! - **Snapshots**: broadcast, callbacks, or latest-value watch
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tempc_lib::{BtleTransport, SessionConfig, SessionHandle};
//!
//! #[tokio::main]
//! async fn main() -> tempc_lib::Result<()> {
//!     let transport = Arc::new(BtleTransport::first_adapter().await?);
//!     let session = SessionHandle::spawn(transport, SessionConfig::default())?;
//!
//!     session.on_snapshot(|snapshot| {
//!         if let Some(message) = snapshot.message() {
//!             println!("{message}");
//!         }
//!     });
//!
//!     session.start()?;
//!     session.set_desired_temperature(62.5)?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Custom transports
//!
//! The session talks to the device only through the
//! [`Transport`](transport::Transport) trait. The `btleplug` feature
//! enables [`BtleTransport`]; tests and other stacks can supply their own.

pub mod codec;
pub mod config;
pub mod error;
pub mod history;
pub mod session;
pub mod snapshot;
pub mod transport;
pub mod types;

pub use config::{GattLayout, RetryPolicy, SessionConfig};
pub use error::{Error, ParseError, Result, TransportError, ValueError};
pub use history::{RingView, Sample, SampleRing, TimelinePoint};
pub use session::{SessionHandle, SessionId, SessionState};
pub use snapshot::{Readings, StateSnapshot, SubscriptionId};
#[cfg(feature = "btleplug")]
pub use transport::BtleTransport;
pub use transport::{ResolvedService, Transport};
pub use types::{DeviceIdentity, MIN_TEMPERATURE, Temperature};
