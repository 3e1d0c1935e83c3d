// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Consumer-facing handle to a running session.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::snapshot::{SnapshotBus, SnapshotCallbacks, StateSnapshot, SubscriptionId};
use crate::transport::Transport;
use crate::types::Temperature;

use super::driver::{Control, SessionDriver, SnapshotSink};
use super::{SessionEvent, SessionId, SessionMachine, SessionState};

/// Handle to a thermostat session running on its own tokio task.
///
/// Commands are queued and processed in order; none of them block. The
/// session reports back only through snapshots. Dropping the handle shuts
/// the session down.
///
/// # Examples
///
/// ```ignore
/// use std::sync::Arc;
/// use tempc_lib::{BtleTransport, SessionConfig, SessionHandle};
///
/// let transport = Arc::new(BtleTransport::first_adapter().await?);
/// let session = SessionHandle::spawn(transport, SessionConfig::default())?;
///
/// let mut snapshots = session.subscribe();
/// session.start()?;
/// session.set_desired_temperature(62.5)?;
///
/// while let Ok(snapshot) = snapshots.recv().await {
///     if let Some(readings) = snapshot.readings() {
///         println!("{} C ({} samples)", readings.temperature, readings.history.len());
///     }
/// }
/// ```
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    control: mpsc::UnboundedSender<Control>,
    bus: SnapshotBus,
    callbacks: Arc<SnapshotCallbacks>,
    latest: watch::Receiver<Option<StateSnapshot>>,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Spawns an idle session on the current tokio runtime.
    ///
    /// Call [`start`](Self::start) to begin scanning.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::ZeroCapacity` if the history capacity is 0.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<T: Transport>(transport: Arc<T>, config: SessionConfig) -> Result<Self> {
        let machine = SessionMachine::new(&config)?;
        let id = SessionId::new();

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (latest_tx, latest_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let callbacks = Arc::new(SnapshotCallbacks::new());
        let bus = SnapshotBus::new();

        let sink = SnapshotSink {
            callbacks: Arc::clone(&callbacks),
            latest: Arc::new(latest_tx),
            bus: bus.clone(),
        };

        tracing::info!(session_id = %id, device_name = %config.device_name, "Spawning session");

        let driver = SessionDriver::new(transport, config, machine, control_rx, sink, state_tx);
        let span = tracing::info_span!("session", session_id = %id);
        let task = tokio::spawn(driver.run().instrument(span));

        Ok(Self {
            id,
            control: control_tx,
            bus,
            callbacks,
            latest: latest_rx,
            state: state_rx,
            task,
        })
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Starts or resumes the session.
    ///
    /// Scans for the device unless one is already bound, in which case it
    /// reconnects directly. No-op while running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session task has exited.
    pub fn start(&self) -> Result<()> {
        self.send(SessionEvent::Start)
    }

    /// Stops the session, keeping the bound device and the history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session task has exited.
    pub fn stop(&self) -> Result<()> {
        self.send(SessionEvent::Stop)
    }

    /// Stops the session and forgets the bound device and the history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session task has exited.
    pub fn reset(&self) -> Result<()> {
        self.send(SessionEvent::Reset)
    }

    /// Requests a new target temperature.
    ///
    /// The value is written on the next polling cycle. A request that has not
    /// been written yet is replaced.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTemperature` if `celsius` is not finite or
    /// lies at or below -273, or [`Error::SessionClosed`] if the session task
    /// has exited.
    pub fn set_desired_temperature(&self, celsius: f32) -> Result<()> {
        let target = Temperature::new(celsius)?;
        self.send(SessionEvent::SetpointRequested(target))
    }

    /// Subscribes to snapshots emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateSnapshot> {
        self.bus.subscribe()
    }

    /// Registers a callback invoked on the session task for every snapshot.
    ///
    /// The callback must not block.
    pub fn on_snapshot<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateSnapshot) + Send + Sync + 'static,
    {
        self.callbacks.on_snapshot(callback)
    }

    /// Removes a callback. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }

    /// Returns the most recent snapshot, if any was emitted.
    #[must_use]
    pub fn latest(&self) -> Option<StateSnapshot> {
        self.latest.borrow().clone()
    }

    /// Returns a receiver that always holds the most recent snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<StateSnapshot>> {
        self.latest.clone()
    }

    /// Returns the lifecycle state after the last processed event.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Returns a receiver for lifecycle state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Stops the session and waits for its task to finish.
    pub async fn shutdown(self) {
        // The task may already be gone
        let _ = self.control.send(Control::Shutdown);
        if let Err(err) = self.task.await {
            tracing::error!(session_id = %self.id, error = %err, "Session task failed");
        }
    }

    fn send(&self, event: SessionEvent) -> Result<()> {
        self.control
            .send(Control::Event(event))
            .map_err(|_| Error::SessionClosed)
    }
}
