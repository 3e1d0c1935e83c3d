// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session task that executes machine effects against a transport.
//!
//! The driver owns everything with a lifetime: the link and its loss watch,
//! the resolved characteristic handles, the single in-flight operation and
//! the single pending timer. Dropping the operation future cancels it, so a
//! stopped session never observes a late result.

use std::future::{Future, pending};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};

use crate::config::SessionConfig;
use crate::error::TransportError;
use crate::snapshot::{SnapshotBus, SnapshotCallbacks, StateSnapshot};
use crate::transport::{ResolvedService, Transport};
use crate::types::DeviceIdentity;

use super::{Attribute, Effect, ServiceLookup, SessionEvent, SessionMachine, SessionState, Timer};

/// Message from a [`SessionHandle`](super::SessionHandle) to its task.
#[derive(Debug)]
pub(crate) enum Control {
    Event(SessionEvent),
    Shutdown,
}

/// Raw result of a transport operation, before it becomes an event.
enum Outcome<L, A> {
    Scanned(Result<DeviceIdentity, TransportError>),
    Connected(Result<L, TransportError>),
    Resolved(Result<Option<ResolvedService<A>>, TransportError>),
    Read {
        attribute: Attribute,
        result: Result<Vec<u8>, TransportError>,
    },
    Written {
        attribute: Attribute,
        result: Result<(), TransportError>,
    },
}

type Operation<T> = Pin<
    Box<
        dyn Future<Output = Outcome<<T as Transport>::Link, <T as Transport>::Attribute>> + Send,
    >,
>;

type LinkWatch = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Fans a snapshot out to every delivery path.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotSink {
    pub(crate) callbacks: Arc<SnapshotCallbacks>,
    pub(crate) latest: Arc<watch::Sender<Option<StateSnapshot>>>,
    pub(crate) bus: SnapshotBus,
}

impl SnapshotSink {
    fn deliver(&self, snapshot: StateSnapshot) {
        tracing::debug!(
            snapshot = ?snapshot.message(),
            is_error = snapshot.is_error(),
            subscribers = self.bus.subscriber_count(),
            callbacks = self.callbacks.len(),
            "Emitting snapshot"
        );
        self.callbacks.dispatch(&snapshot);
        self.latest.send_replace(Some(snapshot.clone()));
        self.bus.publish(snapshot);
    }
}

/// Owns one session and runs until shut down.
pub(crate) struct SessionDriver<T: Transport> {
    transport: Arc<T>,
    config: SessionConfig,
    machine: SessionMachine,
    link: Option<T::Link>,
    link_watch: Option<LinkWatch>,
    service: Option<ResolvedService<T::Attribute>>,
    operation: Option<Operation<T>>,
    timer: Option<(Instant, Timer)>,
    control: mpsc::UnboundedReceiver<Control>,
    sink: SnapshotSink,
    state: watch::Sender<SessionState>,
}

impl<T: Transport> SessionDriver<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        config: SessionConfig,
        machine: SessionMachine,
        control: mpsc::UnboundedReceiver<Control>,
        sink: SnapshotSink,
        state: watch::Sender<SessionState>,
    ) -> Self {
        Self {
            transport,
            config,
            machine,
            link: None,
            link_watch: None,
            service: None,
            operation: None,
            timer: None,
            control,
            sink,
            state,
        }
    }

    /// Processes control messages, operation outcomes, link loss and timers
    /// until shutdown or until every handle is gone. Tears the session down before
    /// returning.
    pub(crate) async fn run(mut self) {
        tracing::debug!("Session task started");

        loop {
            tokio::select! {
                biased;

                control = self.control.recv() => match control {
                    Some(Control::Event(event)) => self.absorb(event).await,
                    Some(Control::Shutdown) | None => break,
                },
                outcome = next_outcome(&mut self.operation) => {
                    self.operation = None;
                    let event = self.translate(outcome);
                    self.absorb(event).await;
                }
                () = next_outcome(&mut self.link_watch) => {
                    self.link_watch = None;
                    tracing::debug!("Transport reported link loss");
                    self.absorb(SessionEvent::Disconnected).await;
                }
                timer = next_timer(self.timer) => {
                    self.timer = None;
                    self.absorb(SessionEvent::TimerFired(timer)).await;
                }
            }
        }

        self.absorb(SessionEvent::Stop).await;
        tracing::debug!("Session task finished");
    }

    async fn absorb(&mut self, event: SessionEvent) {
        let effects = self.machine.handle(event, Instant::now());
        for effect in effects {
            self.apply(effect).await;
        }

        let state = self.machine.state();
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    async fn apply(&mut self, effect: Effect) {
        let timeout = self.config.timing.operation_timeout;

        match effect {
            Effect::StartScan => {
                let transport = Arc::clone(&self.transport);
                let name = self.config.device_name.clone();
                self.begin(async move { Outcome::Scanned(transport.scan(&name).await) });
            }
            Effect::StopScan => {
                if let Err(err) = within(timeout, self.transport.stop_scan()).await {
                    tracing::warn!(error = %err, "Failed to stop scan");
                }
            }
            Effect::Connect(device) => {
                let transport = Arc::clone(&self.transport);
                self.begin(async move {
                    Outcome::Connected(within(timeout, transport.connect(&device)).await)
                });
            }
            Effect::DiscoverServices => {
                let Some(link) = self.link.clone() else {
                    self.begin(async { Outcome::Resolved(Err(TransportError::Disconnected)) });
                    return;
                };
                let transport = Arc::clone(&self.transport);
                let layout = self.config.gatt;
                self.begin(async move {
                    Outcome::Resolved(within(timeout, transport.resolve(&link, &layout)).await)
                });
            }
            Effect::Read(attribute) => {
                let Some((link, handle)) = self.target(attribute) else {
                    self.begin(async move {
                        Outcome::Read {
                            attribute,
                            result: Err(TransportError::Disconnected),
                        }
                    });
                    return;
                };
                let transport = Arc::clone(&self.transport);
                self.begin(async move {
                    let result = within(timeout, transport.read(&link, &handle)).await;
                    Outcome::Read { attribute, result }
                });
            }
            Effect::Write { attribute, payload } => {
                let Some((link, handle)) = self.target(attribute) else {
                    self.begin(async move {
                        Outcome::Written {
                            attribute,
                            result: Err(TransportError::Disconnected),
                        }
                    });
                    return;
                };
                let transport = Arc::clone(&self.transport);
                self.begin(async move {
                    let result = within(timeout, transport.write(&link, &handle, &payload)).await;
                    Outcome::Written { attribute, result }
                });
            }
            Effect::Disconnect => {
                self.link_watch = None;
                self.service = None;
                if let Some(link) = self.link.take() {
                    tracing::debug!("Closing link");
                    if let Err(err) = within(timeout, self.transport.disconnect(&link)).await {
                        tracing::debug!(error = %err, "Disconnect reported an error");
                    }
                }
            }
            Effect::Schedule { timer, after } => {
                self.timer = Some((Instant::now() + after, timer));
            }
            Effect::CancelTimer => self.timer = None,
            Effect::CancelOperation => self.operation = None,
            Effect::Emit(snapshot) => self.sink.deliver(snapshot),
        }
    }

    fn begin<F>(&mut self, operation: F)
    where
        F: Future<Output = Outcome<T::Link, T::Attribute>> + Send + 'static,
    {
        if self.operation.is_some() {
            tracing::warn!("Replacing an in-flight operation");
        }
        self.operation = Some(Box::pin(operation));
    }

    fn watch_link(&mut self, link: &T::Link) {
        let transport = Arc::clone(&self.transport);
        let link = link.clone();
        self.link_watch = Some(Box::pin(async move { transport.disconnected(&link).await }));
    }

    fn target(&self, attribute: Attribute) -> Option<(T::Link, T::Attribute)> {
        let link = self.link.clone()?;
        let service = self.service.as_ref()?;
        let handle = match attribute {
            Attribute::Temperature => service.temperature.clone(),
            Attribute::Setpoint => service.setpoint.clone(),
        };
        Some((link, handle))
    }

    /// Turns an outcome into an event, keeping any handle it carries.
    fn translate(&mut self, outcome: Outcome<T::Link, T::Attribute>) -> SessionEvent {
        match outcome {
            Outcome::Scanned(result) => SessionEvent::ScanResult(result),
            Outcome::Connected(result) => SessionEvent::Connected(result.map(|link| {
                self.watch_link(&link);
                self.link = Some(link);
            })),
            Outcome::Resolved(result) => {
                SessionEvent::ServicesResolved(result.map(|service| match service {
                    Some(service) => {
                        self.service = Some(service);
                        ServiceLookup::Found
                    }
                    None => ServiceLookup::Missing,
                }))
            }
            Outcome::Read { attribute, result } => {
                SessionEvent::CharacteristicRead { attribute, result }
            }
            Outcome::Written { attribute, result } => {
                SessionEvent::CharacteristicWritten { attribute, result }
            }
        }
    }
}

async fn next_outcome<O>(operation: &mut Option<Pin<Box<dyn Future<Output = O> + Send>>>) -> O {
    match operation {
        Some(operation) => operation.await,
        None => pending().await,
    }
}

async fn next_timer(timer: Option<(Instant, Timer)>) -> Timer {
    match timer {
        Some((deadline, timer)) => {
            sleep_until(deadline).await;
            timer
        }
        None => pending().await,
    }
}

/// Bounds a transport operation by `timeout`.
async fn within<V>(
    timeout: Duration,
    operation: impl Future<Output = Result<V, TransportError>>,
) -> Result<V, TransportError> {
    #[allow(clippy::cast_possible_truncation)]
    let timeout_ms = timeout.as_millis() as u64;

    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| TransportError::Timeout(timeout_ms))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn within_reports_timeout_in_millis() {
        let result: Result<(), TransportError> =
            within(Duration::from_millis(1500), pending()).await;
        assert_eq!(result, Err(TransportError::Timeout(1500)));
    }

    #[tokio::test]
    async fn within_passes_result_through() {
        let result = within(Duration::from_secs(1), async { Ok::<_, TransportError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn next_timer_fires_at_deadline() {
        let start = Instant::now();
        let timer = next_timer(Some((start + Duration::from_secs(5), Timer::Poll))).await;
        assert_eq!(timer, Timer::Poll);
        assert!(Instant::now() >= start + Duration::from_secs(5));
    }
}
