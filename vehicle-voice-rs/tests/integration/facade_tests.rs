//! Event translation, battery debouncing and the speech gate, end to end.

use tokio::sync::mpsc;
use vehicle_voice::events::{EventKind, VehicleEvent};
use vehicle_voice::facade::Inbound;
use vehicle_voice::mode::FlightMode;
use vehicle_voice::translator::INVALID_POLYGON_MESSAGE;

use crate::mock_ports::Harness;

#[test]
fn mode_and_arming_announcements() {
    let mut h = Harness::new();
    h.fire_with(EventKind::Arming, |v| v.armed = true);
    h.fire_with(EventKind::Mode, |v| v.mode = FlightMode::RotorRtl);
    h.fire_with(EventKind::Mode, |v| v.mode = FlightMode::FixedWingRtl);
    h.fire_with(EventKind::Mode, |v| v.mode = FlightMode::RotorAltHold);
    h.fire_with(EventKind::Arming, |v| v.armed = false);

    assert_eq!(
        h.speech.spoken(),
        vec![
            "Armed",
            "Mode Return to home",
            "Mode Return to home",
            "Mode Altitude hold",
            "Disarmed"
        ]
    );
}

#[test]
fn gps_fix_announcements() {
    let mut h = Harness::new();
    for fix in [3, 1, 2] {
        h.fire_with(EventKind::GpsFix, |v| v.gps_fix = fix);
    }
    assert_eq!(h.speech.spoken(), vec!["GPS 3D Lock", "Lost GPS Lock", "GPS 2D Lock"]);
}

#[test]
fn mission_events_speak_and_toast() {
    let mut h = Harness::new();
    h.fire(EventKind::MissionSent);
    h.fire(EventKind::MissionReceived);
    h.fire(EventKind::InvalidPolygon);

    assert_eq!(h.speech.spoken(), vec!["Waypoints saved to Drone", "Waypoints received"]);
    assert_eq!(
        h.toasts.shown(),
        vec!["Waypoints sent", "Waypoints received from Drone", INVALID_POLYGON_MESSAGE]
    );
}

#[test]
fn battery_discharge_is_debounced() {
    let mut h = Harness::new();
    for percent in [95.0, 94.0, 93.0, 85.0, 84.0] {
        h.fire_with(EventKind::Battery, |v| v.battery_remaining = percent);
    }
    assert_eq!(h.speech.spoken(), vec!["Battery at 95%", "Battery at 85%"]);
}

#[tokio::test]
async fn new_connection_resets_the_battery_debouncer() {
    let mut h = Harness::new();
    h.fire(EventKind::HeartbeatFirst);
    h.fire_with(EventKind::Battery, |v| v.battery_remaining = 75.0);
    h.fire(EventKind::Battery);
    h.fire(EventKind::Disconnected);
    h.fire(EventKind::HeartbeatFirst);
    h.fire(EventKind::Battery);

    assert_eq!(
        h.speech.spoken(),
        vec!["Connected", "Battery at 75%", "Connected", "Battery at 75%"]
    );
}

#[test]
fn muted_drops_speech_but_keeps_toasts() {
    let mut h = Harness::new();
    h.prefs.set_audible(false);
    h.fire(EventKind::MissionSent);
    h.facade.quick_notify("Photo taken");
    assert!(h.speech.spoken().is_empty());
    assert_eq!(h.toasts.shown(), vec!["Waypoints sent"]);

    h.prefs.set_audible(true);
    h.facade.quick_notify("Photo taken");
    assert_eq!(h.speech.spoken(), vec!["Photo taken"]);
}

#[test]
fn unavailable_sink_drops_without_queueing() {
    let mut h = Harness::new();
    h.speech.set_available(false);
    h.fire(EventKind::FollowStart);
    h.speech.set_available(true);
    h.fire(EventKind::ArmingStarted);
    assert_eq!(h.speech.spoken(), vec!["Arming the vehicle, please standby"]);
}

#[test]
fn failsafe_speaks_reason_only_while_active() {
    let mut h = Harness::new();
    h.fire_with(EventKind::Failsafe, |v| {
        v.failsafe = true;
        v.failsafe_reason = "Vehicle failsafe".into();
    });
    h.fire_with(EventKind::Failsafe, |v| v.failsafe = false);
    h.fire_with(EventKind::MissionWpUpdate, |v| v.current_waypoint = 3);
    assert_eq!(h.speech.spoken(), vec!["Vehicle failsafe", "Going for waypoint 3"]);
}

#[tokio::test]
async fn run_loop_processes_inbound_in_order() {
    let h = Harness::new();
    let speech = h.speech.clone();
    let mut arming = h.vehicle.snapshot();
    arming.armed = true;

    let (tx, rx) = mpsc::channel(8);
    let task = tokio::spawn(h.facade.run(rx));

    tx.send(Inbound::QuickNotify("Ready".into())).await.unwrap();
    tx.send(Inbound::Event(VehicleEvent::new(EventKind::Arming, arming)))
        .await
        .unwrap();
    tx.send(Inbound::Event(VehicleEvent::new(
        EventKind::PeriodicSpeech,
        Default::default(),
    )))
    .await
    .unwrap();
    drop(tx);
    task.await.unwrap();

    assert_eq!(speech.spoken(), vec!["Ready", "Armed"]);
}
