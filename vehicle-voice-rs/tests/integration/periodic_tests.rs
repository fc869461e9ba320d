//! Periodic status digest driven through the facade.

use std::time::Duration;

use tokio::time::sleep;
use vehicle_voice::events::EventKind;
use vehicle_voice::facade::Inbound;
use vehicle_voice::prefs::PeriodicField;
use vehicle_voice::scheduler::SchedulerState;

use crate::mock_ports::Harness;

fn with_telemetry(h: &Harness) {
    h.vehicle.update(|v| {
        v.battery_voltage = 11.1;
        v.altitude = 12.36;
        v.airspeed = 14.05;
        v.rssi = -70;
    });
}

#[tokio::test(start_paused = true)]
async fn digest_speaks_enabled_fields_in_order() {
    let mut h = Harness::new();
    with_telemetry(&h);
    h.prefs.set_periodic_interval(5);
    h.prefs.set_periodic_fields([PeriodicField::Rssi, PeriodicField::Altitude]);
    h.fire(EventKind::HeartbeatFirst);
    h.speech.clear();

    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(h.speech.spoken(), vec!["altitude, 12.3 meters. r s s i, -70 decibels"]);

    h.prefs.set_periodic_fields(PeriodicField::ALL);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(
        h.speech.spoken()[1],
        "battery 11.10 volts. altitude, 12.3 meters. \
         airspeed, 14.0 meters per second. r s s i, -70 decibels"
    );
}

#[tokio::test(start_paused = true)]
async fn digest_reads_live_telemetry_and_mute() {
    let mut h = Harness::new();
    h.prefs.set_periodic_interval(5);
    h.prefs.set_periodic_fields([PeriodicField::Altitude]);
    h.fire(EventKind::HeartbeatFirst);
    h.speech.clear();
    h.prefs.set_audible(false);

    sleep(Duration::from_millis(5_500)).await;
    assert!(h.speech.spoken().is_empty());
    assert_eq!(h.facade.scheduler().ticks_fired(), 1);

    h.prefs.set_audible(true);
    h.vehicle.update(|v| v.altitude = 40.0);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.speech.spoken(), vec!["altitude, 40.0 meters. "]);
}

#[tokio::test(start_paused = true)]
async fn restart_with_zero_interval_never_ticks() {
    let h = Harness::new();
    h.facade.setup_periodic_speech_output(5, h.vehicle.clone());
    h.facade.setup_periodic_speech_output(0, h.vehicle.clone());

    sleep(Duration::from_secs(60)).await;
    assert_eq!(h.facade.scheduler().state(), SchedulerState::Idle);
    assert_eq!(h.facade.scheduler().ticks_fired(), 0);
    assert!(h.speech.spoken().is_empty());
}

#[tokio::test(start_paused = true)]
async fn setup_request_only_applies_while_connected() {
    let mut h = Harness::new();
    h.facade.handle(Inbound::SetupPeriodic { interval_secs: 5 });
    assert_eq!(h.facade.scheduler().state(), SchedulerState::Idle);

    h.fire(EventKind::HeartbeatFirst);
    assert_eq!(h.facade.scheduler().state(), SchedulerState::Idle);

    h.facade.handle(Inbound::SetupPeriodic { interval_secs: 5 });
    assert!(matches!(
        h.facade.scheduler().state(),
        SchedulerState::Scheduled { interval_secs: 5, .. }
    ));
}
