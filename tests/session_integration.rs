// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests driving a session against a scripted transport on
//! paused time.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{Call, FakeTransport, next_error, next_readings};
use tempc_lib::session::{Attribute, SessionState};
use tempc_lib::snapshot::StateSnapshot;
use tempc_lib::{Error, SessionConfig, SessionHandle, TransportError, ValueError};
use tokio::sync::broadcast::error::TryRecvError;

fn spawn(fake: &Arc<FakeTransport>) -> SessionHandle {
    SessionHandle::spawn(Arc::clone(fake), SessionConfig::default()).unwrap()
}

async fn wait_for_state(session: &SessionHandle, state: SessionState) {
    let mut rx = session.watch_state();
    rx.wait_for(|current| *current == state).await.unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn start_reports_progress_then_readings() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();

        session.start().unwrap();

        assert_eq!(rx.recv().await.unwrap(), StateSnapshot::status("Scanning"));
        assert_eq!(
            rx.recv().await.unwrap(),
            StateSnapshot::status("Connecting to C8:2B:96:A1:04:7E")
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            StateSnapshot::status("Discovering services")
        );
        assert_eq!(rx.recv().await.unwrap(), StateSnapshot::status("Reading"));

        let readings = next_readings(&mut rx).await;
        assert!((readings.temperature - 21.5).abs() < f32::EPSILON);
        assert_eq!(readings.setpoint, Some(60.0));
        assert_eq!(readings.history.len(), 1);

        assert_eq!(
            fake.calls(),
            vec![
                Call::Scan,
                Call::StopScan,
                Call::Connect,
                Call::Resolve,
                Call::Read(Attribute::Setpoint),
                Call::Read(Attribute::Temperature),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn readings_arrive_every_poll_interval() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();

        for _ in 0..3 {
            next_readings(&mut rx).await;
        }

        let reads = fake.times(&Call::Read(Attribute::Temperature));
        assert_eq!(reads.len(), 3);
        assert_eq!(reads[1] - reads[0], Duration::from_secs(5));
        assert_eq!(reads[2] - reads[1], Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_keeps_device_and_history() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();
        next_readings(&mut rx).await;

        session.stop().unwrap();
        wait_for_state(&session, SessionState::Stopped).await;
        assert_eq!(fake.count(&Call::Disconnect), 1);

        // Nothing else happens while stopped
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fake.count(&Call::Read(Attribute::Temperature)), 1);

        session.start().unwrap();
        let readings = next_readings(&mut rx).await;

        assert_eq!(readings.history.len(), 2);
        assert_eq!(fake.count(&Call::Scan), 1);
        assert_eq!(fake.count(&Call::Connect), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_forgets_device_and_history() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();
        next_readings(&mut rx).await;

        session.reset().unwrap();
        wait_for_state(&session, SessionState::Idle).await;

        session.start().unwrap();
        let readings = next_readings(&mut rx).await;

        assert_eq!(readings.history.len(), 1);
        assert_eq!(fake.count(&Call::Scan), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_link() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();
        next_readings(&mut rx).await;

        session.shutdown().await;

        assert_eq!(fake.count(&Call::Disconnect), 1);
    }
}

// ============================================================================
// Failures
// ============================================================================

mod failures {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn missing_service_reports_one_error_and_stops() {
        let fake = FakeTransport::new();
        fake.without_service();
        let session = spawn(&fake);
        let mut rx = session.subscribe();

        session.start().unwrap();
        assert_eq!(next_error(&mut rx).await, "Service not found");
        wait_for_state(&session, SessionState::Stopped).await;

        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(fake.count(&Call::Resolve), 1);
        assert_eq!(fake.count(&Call::Disconnect), 1);
        assert!(session.latest().unwrap().is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_read_is_retried_once_without_error() {
        let fake = FakeTransport::new();
        fake.script_temperature_read(Err(TransportError::Refused("busy".to_string())));
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();

        // next_readings panics on an error snapshot
        let readings = next_readings(&mut rx).await;
        assert_eq!(readings.history.len(), 1);

        let reads = fake.times(&Call::Read(Attribute::Temperature));
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[1] - reads[0], Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_is_skipped() {
        let fake = FakeTransport::new();
        fake.script_temperature_read(Ok(vec![0x00, 0x01]));
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();

        let readings = next_readings(&mut rx).await;

        assert_eq!(readings.history.len(), 1);
        assert_eq!(fake.count(&Call::Read(Attribute::Temperature)), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failure_is_retried_after_one_second() {
        let fake = FakeTransport::new();
        fake.script_connect(Err(TransportError::ConnectFailed("refused".to_string())));
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();

        next_readings(&mut rx).await;

        let connects = fake.times(&Call::Connect);
        assert_eq!(connects.len(), 2);
        assert_eq!(connects[1] - connects[0], Duration::from_secs(1));
        assert_eq!(fake.count(&Call::Scan), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_failure_is_fatal() {
        let fake = FakeTransport::new();
        fake.script_scan(Err(TransportError::ScanFailed("code 2".to_string())));
        let session = spawn(&fake);
        let mut rx = session.subscribe();

        session.start().unwrap();

        assert_eq!(next_error(&mut rx).await, "Scan failed: code 2");
        wait_for_state(&session, SessionState::Stopped).await;
        assert_eq!(fake.count(&Call::Connect), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_adapter_is_fatal() {
        let fake = FakeTransport::new();
        fake.script_scan(Err(TransportError::AdapterUnavailable(
            "powered off".to_string(),
        )));
        let session = spawn(&fake);
        let mut rx = session.subscribe();

        session.start().unwrap();

        assert_eq!(
            next_error(&mut rx).await,
            "Bluetooth adapter unavailable: powered off"
        );
        wait_for_state(&session, SessionState::Stopped).await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_preserves_history_without_rescan() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();

        for i in 0..5u8 {
            fake.set_temperature(20.0 + f32::from(i));
            let readings = next_readings(&mut rx).await;
            assert_eq!(readings.history.len(), usize::from(i) + 1);
        }

        fake.script_temperature_read(Err(TransportError::Disconnected));
        let readings = next_readings(&mut rx).await;

        assert_eq!(readings.history.len(), 6);
        assert_eq!(fake.count(&Call::Scan), 1);
        assert_eq!(fake.count(&Call::Connect), 2);
        assert_eq!(fake.count(&Call::Disconnect), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_link_reconnects_before_next_poll() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();

        next_readings(&mut rx).await;
        next_readings(&mut rx).await;
        fake.drop_link();

        let readings = next_readings(&mut rx).await;
        assert_eq!(readings.history.len(), 3);
        assert_eq!(fake.count(&Call::Scan), 1);
        assert_eq!(fake.count(&Call::Connect), 2);
        assert_eq!(fake.count(&Call::Disconnect), 1);

        let reads = fake.times(&Call::Read(Attribute::Temperature));
        let connects = fake.times(&Call::Connect);
        assert_eq!(reads.len(), 3);
        assert_eq!(connects[1] - reads[1], Duration::from_secs(1));
        assert_eq!(reads[2] - reads[1], Duration::from_secs(6));
    }
}

// ============================================================================
// Setpoint
// ============================================================================

mod setpoint {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pending_write_precedes_setpoint_refresh() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();

        session.set_desired_temperature(70.0).unwrap();
        session.start().unwrap();
        let readings = next_readings(&mut rx).await;

        assert_eq!(readings.setpoint, Some(70.0));
        assert!((fake.setpoint() - 70.0).abs() < f32::EPSILON);
        assert_eq!(
            fake.calls()[3..],
            [
                Call::Resolve,
                Call::Write(70.0),
                Call::Read(Attribute::Temperature),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn last_request_wins() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();
        next_readings(&mut rx).await;

        session.set_desired_temperature(65.0).unwrap();
        session.set_desired_temperature(68.0).unwrap();
        next_readings(&mut rx).await;

        assert_eq!(fake.count(&Call::Write(65.0)), 0);
        assert_eq!(fake.count(&Call::Write(68.0)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_is_retried() {
        let fake = FakeTransport::new();
        fake.script_write(Err(TransportError::Refused("busy".to_string())));
        let session = spawn(&fake);
        let mut rx = session.subscribe();

        session.set_desired_temperature(70.0).unwrap();
        session.start().unwrap();
        let readings = next_readings(&mut rx).await;

        assert_eq!(fake.count(&Call::Write(70.0)), 2);
        assert_eq!(readings.setpoint, Some(70.0));
    }

    #[tokio::test(start_paused = true)]
    async fn setpoint_is_refreshed_after_ten_minutes() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();
        session.start().unwrap();

        // 10 minutes of 5 s polls plus the initial setpoint read
        for _ in 0..122 {
            next_readings(&mut rx).await;
        }

        assert_eq!(fake.count(&Call::Read(Attribute::Setpoint)), 2);
    }

    #[tokio::test]
    async fn invalid_value_is_rejected() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);

        let result = session.set_desired_temperature(f32::NAN);
        assert!(matches!(
            result,
            Err(Error::Value(ValueError::InvalidTemperature(_)))
        ));
        assert!(session.set_desired_temperature(-300.0).is_err());
    }
}

// ============================================================================
// Delivery
// ============================================================================

mod delivery {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn callbacks_see_every_snapshot_until_unsubscribed() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        let mut rx = session.subscribe();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let id = session.on_snapshot(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        session.start().unwrap();
        next_readings(&mut rx).await;
        // Scanning, Connecting, Discovering, Reading, readings
        assert_eq!(seen.load(Ordering::SeqCst), 5);

        assert!(session.unsubscribe(id));
        next_readings(&mut rx).await;
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_holds_most_recent_snapshot() {
        let fake = FakeTransport::new();
        let session = spawn(&fake);
        assert!(session.latest().is_none());

        let mut rx = session.subscribe();
        session.start().unwrap();
        let readings = next_readings(&mut rx).await;

        assert_eq!(
            session.latest().and_then(|s| s.readings().cloned()),
            Some(readings)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_have_distinct_ids() {
        let fake = FakeTransport::new();
        let first = spawn(&fake);
        let id = first.id();
        first.shutdown().await;

        let second = spawn(&fake);
        assert_ne!(second.id(), id);
        assert_eq!(second.state(), SessionState::Idle);
    }
}
