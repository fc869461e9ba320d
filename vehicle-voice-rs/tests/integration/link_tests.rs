//! Connection-health transitions and their effect on the periodic digest.

use vehicle_voice::events::EventKind;
use vehicle_voice::link::{LinkState, CONNECTED, LINK_LOST, LINK_RESTORED};
use vehicle_voice::scheduler::SchedulerState;

use crate::mock_ports::Harness;

fn connected_harness(interval: u32) -> Harness {
    let mut h = Harness::new();
    h.prefs.set_periodic_interval(interval);
    h.fire(EventKind::HeartbeatFirst);
    h
}

#[tokio::test(start_paused = true)]
async fn lose_and_restore_link() {
    let mut h = connected_harness(10);
    let scheduler = h.facade.scheduler();
    let mut link = h.facade.subscribe_link();
    assert_eq!(h.facade.link_state(), LinkState::Connected);
    assert!(matches!(
        scheduler.state(),
        SchedulerState::Scheduled { interval_secs: 10, .. }
    ));

    h.fire(EventKind::HeartbeatTimeout);
    assert_eq!(h.facade.link_state(), LinkState::LinkLost);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert!(link.has_changed().unwrap());
    assert_eq!(*link.borrow_and_update(), LinkState::LinkLost);

    h.prefs.set_periodic_interval(20);
    h.fire(EventKind::HeartbeatRestored);
    assert_eq!(h.facade.link_state(), LinkState::Connected);
    assert!(matches!(
        scheduler.state(),
        SchedulerState::Scheduled { interval_secs: 20, .. }
    ));

    assert_eq!(h.speech.spoken(), vec![CONNECTED, LINK_LOST, LINK_RESTORED]);
}

#[tokio::test(start_paused = true)]
async fn timeout_during_calibration_is_silent_and_keeps_the_timer() {
    let mut h = connected_harness(10);
    let scheduler = h.facade.scheduler();
    let before = scheduler.state();
    h.speech.clear();

    h.calibration.set(true);
    h.fire(EventKind::HeartbeatTimeout);

    assert!(h.speech.spoken().is_empty());
    assert_eq!(scheduler.state(), before);
    assert_eq!(h.facade.link_state(), LinkState::Connected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_always_leaves_the_scheduler_idle() {
    for lead_in in [
        vec![],
        vec![EventKind::HeartbeatFirst],
        vec![EventKind::HeartbeatFirst, EventKind::HeartbeatTimeout],
    ] {
        let mut h = Harness::new();
        h.prefs.set_periodic_interval(5);
        for kind in lead_in {
            h.fire(kind);
        }
        let spoken_before = h.speech.spoken().len();

        h.fire(EventKind::Disconnected);
        assert_eq!(h.facade.scheduler().state(), SchedulerState::Idle);
        assert_eq!(h.facade.link_state(), LinkState::Disconnected);
        assert_eq!(h.speech.spoken().len(), spoken_before);
    }
}

#[tokio::test(start_paused = true)]
async fn stray_tick_after_disconnect_is_a_no_op() {
    let mut h = connected_harness(5);
    let scheduler = h.facade.scheduler();
    let SchedulerState::Scheduled { generation, .. } = scheduler.state() else {
        panic!("expected a scheduled digest after connect");
    };
    h.speech.clear();

    h.fire(EventKind::Disconnected);
    assert!(!scheduler.on_tick(generation));
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;

    assert_eq!(scheduler.ticks_fired(), 0);
    assert!(h.speech.spoken().is_empty());
}

#[tokio::test(start_paused = true)]
async fn restore_after_a_calibration_stall_is_silent() {
    let mut h = connected_harness(10);
    let scheduler = h.facade.scheduler();
    let before = scheduler.state();
    h.speech.clear();

    h.calibration.set(true);
    h.fire(EventKind::HeartbeatTimeout);
    h.calibration.set(false);
    h.fire(EventKind::HeartbeatRestored);

    assert!(h.speech.spoken().is_empty());
    assert_eq!(scheduler.state(), before);
    assert_eq!(h.facade.link_state(), LinkState::Connected);
}

#[tokio::test(start_paused = true)]
async fn stray_timeout_while_disconnected_says_nothing() {
    let mut h = Harness::new();
    h.fire(EventKind::HeartbeatTimeout);
    h.fire(EventKind::HeartbeatRestored);

    assert!(h.speech.spoken().is_empty());
    assert_eq!(h.facade.link_state(), LinkState::Disconnected);
    assert_eq!(h.facade.scheduler().state(), SchedulerState::Idle);
}
