//! MAVLink telemetry source.
//!
//! A blocking reader task pulls messages off the link and hands the
//! interesting ones, reduced to [`Sample`]s, to an async loop. The loop
//! folds them into the shared vehicle snapshot with a [`VehicleTracker`]
//! and forwards the derived events to the facade. A dropped link is
//! reported as DISCONNECTED and redialled with exponential backoff.

use std::time::Duration;

use mavlink::common::{MavAutopilot, MavMessage, MavModeFlag, MavState, MavType};
use mavlink::error::MessageReadError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::events::{EventKind, VehicleEvent};
use crate::facade::Inbound;
use crate::mode::{FlightMode, Frame};
use crate::vehicle::SharedVehicle;

const FAILSAFE_REASON: &str = "Vehicle failsafe";

const RECONNECT_INITIAL: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// The parts of a MAVLink message the tracker cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Heartbeat {
        armed: bool,
        frame: Frame,
        custom_mode: u32,
        critical: bool,
    },
    SysStatus {
        voltage: Option<f64>,
        remaining: Option<f64>,
    },
    Gps {
        fix: u8,
    },
    Hud {
        altitude: f64,
        airspeed: f64,
    },
    Radio {
        rssi: i32,
    },
    MissionCurrent {
        seq: u16,
    },
}

pub fn frame_of(mavtype: MavType) -> Frame {
    match mavtype {
        MavType::MAV_TYPE_FIXED_WING => Frame::FixedWing,
        MavType::MAV_TYPE_QUADROTOR
        | MavType::MAV_TYPE_HEXAROTOR
        | MavType::MAV_TYPE_OCTOROTOR
        | MavType::MAV_TYPE_TRICOPTER
        | MavType::MAV_TYPE_COAXIAL
        | MavType::MAV_TYPE_HELICOPTER => Frame::Rotor,
        _ => Frame::Other,
    }
}

pub fn sample_from(msg: &MavMessage) -> Option<Sample> {
    match msg {
        MavMessage::HEARTBEAT(hb) => {
            // Ground stations heartbeat too.
            if matches!(hb.autopilot, MavAutopilot::MAV_AUTOPILOT_INVALID) {
                return None;
            }
            Some(Sample::Heartbeat {
                armed: hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED),
                frame: frame_of(hb.mavtype),
                custom_mode: hb.custom_mode,
                critical: matches!(
                    hb.system_status,
                    MavState::MAV_STATE_CRITICAL | MavState::MAV_STATE_EMERGENCY
                ),
            })
        }
        MavMessage::SYS_STATUS(status) => Some(Sample::SysStatus {
            // voltage_battery is in millivolts, u16::MAX when unknown
            voltage: (status.voltage_battery != u16::MAX)
                .then(|| f64::from(status.voltage_battery) / 1000.0),
            // battery_remaining is -1 when unknown
            remaining: (0..=100)
                .contains(&status.battery_remaining)
                .then(|| f64::from(status.battery_remaining)),
        }),
        MavMessage::GPS_RAW_INT(gps) => Some(Sample::Gps {
            fix: gps.fix_type as u8,
        }),
        MavMessage::VFR_HUD(hud) => Some(Sample::Hud {
            altitude: f64::from(hud.alt),
            airspeed: f64::from(hud.airspeed),
        }),
        MavMessage::RADIO_STATUS(radio) => Some(Sample::Radio {
            rssi: i32::from(radio.rssi),
        }),
        MavMessage::MISSION_CURRENT(mission) => Some(Sample::MissionCurrent { seq: mission.seq }),
        _ => None,
    }
}

/// Folds samples into the shared snapshot and derives vehicle events.
///
/// Arming, mode, GPS and waypoint events fire on changes after the first
/// known value. Battery fires on every change of the remaining percentage;
/// the facade debounces it.
pub struct VehicleTracker {
    vehicle: SharedVehicle,
    heartbeat_timeout: Duration,
    last_heartbeat: Option<Instant>,
    link_lost: bool,
    armed: Option<bool>,
    mode: Option<FlightMode>,
    gps_fix: Option<u8>,
    battery: Option<f64>,
    waypoint: Option<u16>,
    failsafe: bool,
}

impl VehicleTracker {
    pub fn new(vehicle: SharedVehicle, heartbeat_timeout: Duration) -> Self {
        Self {
            vehicle,
            heartbeat_timeout,
            last_heartbeat: None,
            link_lost: false,
            armed: None,
            mode: None,
            gps_fix: None,
            battery: None,
            waypoint: None,
            failsafe: false,
        }
    }

    pub fn ingest(&mut self, sample: Sample, now: Instant) -> Vec<VehicleEvent> {
        let mut kinds = Vec::new();

        match sample {
            Sample::Heartbeat {
                armed,
                frame,
                custom_mode,
                critical,
            } => {
                if self.last_heartbeat.is_none() {
                    kinds.push(EventKind::HeartbeatFirst);
                } else if self.link_lost {
                    kinds.push(EventKind::HeartbeatRestored);
                }
                self.last_heartbeat = Some(now);
                self.link_lost = false;

                let mode = FlightMode::from_custom_mode(frame, custom_mode);
                if changed(&mut self.armed, armed) {
                    kinds.push(EventKind::Arming);
                }
                if changed(&mut self.mode, mode) {
                    kinds.push(EventKind::Mode);
                }
                if critical && !self.failsafe {
                    kinds.push(EventKind::Failsafe);
                }
                self.failsafe = critical;

                self.vehicle.update(|v| {
                    v.armed = armed;
                    v.mode = mode;
                    v.failsafe = critical;
                    if critical {
                        v.failsafe_reason = FAILSAFE_REASON.to_string();
                    }
                });
            }
            Sample::SysStatus { voltage, remaining } => {
                if let Some(remaining) = remaining {
                    if self.battery != Some(remaining) {
                        self.battery = Some(remaining);
                        kinds.push(EventKind::Battery);
                    }
                }
                self.vehicle.update(|v| {
                    if let Some(voltage) = voltage {
                        v.battery_voltage = voltage;
                    }
                    if let Some(remaining) = remaining {
                        v.battery_remaining = remaining;
                    }
                });
            }
            Sample::Gps { fix } => {
                if changed(&mut self.gps_fix, fix) {
                    kinds.push(EventKind::GpsFix);
                }
                self.vehicle.update(|v| v.gps_fix = fix);
            }
            Sample::Hud { altitude, airspeed } => self.vehicle.update(|v| {
                v.altitude = altitude;
                v.airspeed = airspeed;
            }),
            Sample::Radio { rssi } => self.vehicle.update(|v| v.rssi = rssi),
            Sample::MissionCurrent { seq } => {
                if changed(&mut self.waypoint, seq) {
                    kinds.push(EventKind::MissionWpUpdate);
                }
                self.vehicle.update(|v| v.current_waypoint = seq);
            }
        }

        self.events(kinds)
    }

    /// HEARTBEAT_TIMEOUT once per silence longer than the timeout.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<VehicleEvent> {
        let last = self.last_heartbeat?;
        if self.link_lost || now.duration_since(last) < self.heartbeat_timeout {
            return None;
        }
        self.link_lost = true;
        self.events(vec![EventKind::HeartbeatTimeout]).pop()
    }

    /// True once a heartbeat has been seen since the last disconnect.
    pub fn is_connected(&self) -> bool {
        self.last_heartbeat.is_some()
    }

    /// The link is gone. Forget everything so the next heartbeat starts fresh.
    pub fn disconnect(&mut self) -> VehicleEvent {
        self.last_heartbeat = None;
        self.link_lost = false;
        self.armed = None;
        self.mode = None;
        self.gps_fix = None;
        self.battery = None;
        self.waypoint = None;
        self.failsafe = false;
        VehicleEvent::new(EventKind::Disconnected, self.vehicle.snapshot())
    }

    fn events(&self, kinds: Vec<EventKind>) -> Vec<VehicleEvent> {
        if kinds.is_empty() {
            return Vec::new();
        }
        let snapshot = self.vehicle.snapshot();
        kinds
            .into_iter()
            .map(|kind| VehicleEvent::new(kind, snapshot.clone()))
            .collect()
    }
}

/// Record `value`; true if it differs from an already known value.
fn changed<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    let changed = matches!(slot, Some(prev) if *prev != value);
    *slot = Some(value);
    changed
}

/// What the blocking reader hands to the async loop.
enum ReaderEvent {
    Sample(Sample),
    /// The connection failed or dropped; the reader is redialling.
    Down,
}

/// Delay before the next connection attempt.
fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(RECONNECT_MAX)
}

/// Connect to the MAVLink link and stream vehicle events into `tx`.
///
/// Runs until `tx` closes. Losing an established link produces a
/// DISCONNECTED event; the next heartbeat after redialling is a
/// HEARTBEAT_FIRST.
pub fn spawn_mavlink_source(
    config: &LinkConfig,
    vehicle: SharedVehicle,
    tx: mpsc::Sender<Inbound>,
) -> JoinHandle<()> {
    let url = config.url.clone();
    let heartbeat_timeout = Duration::from_millis(config.heartbeat_timeout_ms);
    let (reader_tx, mut reader_rx) = mpsc::channel::<ReaderEvent>(64);

    tokio::task::spawn_blocking(move || read_link(&url, reader_tx));

    tokio::spawn(async move {
        let mut tracker = VehicleTracker::new(vehicle, heartbeat_timeout);
        let mut timeout_check = tokio::time::interval(Duration::from_millis(250));

        loop {
            tokio::select! {
                event = reader_rx.recv() => {
                    let events = match event {
                        Some(ReaderEvent::Sample(sample)) => tracker.ingest(sample, Instant::now()),
                        Some(ReaderEvent::Down) if tracker.is_connected() => vec![tracker.disconnect()],
                        Some(ReaderEvent::Down) => Vec::new(),
                        None => break,
                    };
                    for event in events {
                        if tx.send(Inbound::Event(event)).await.is_err() {
                            return;
                        }
                    }
                }
                _ = timeout_check.tick() => {
                    if let Some(event) = tracker.poll_timeout(Instant::now()) {
                        warn!("No heartbeat for {}ms", heartbeat_timeout.as_millis());
                        if tx.send(Inbound::Event(event)).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
        info!("Telemetry source stopped");
    })
}

/// Dial `url` and pump samples until the receiver goes away, redialling
/// with backoff whenever the connection fails.
fn read_link(url: &str, events: mpsc::Sender<ReaderEvent>) {
    let mut backoff = RECONNECT_INITIAL;

    while !events.is_closed() {
        match read_session(url, &events) {
            Session::Closed => return,
            Session::Failed { received } => {
                if received {
                    backoff = RECONNECT_INITIAL;
                }
                if events.blocking_send(ReaderEvent::Down).is_err() {
                    return;
                }
                info!("Reconnecting to {url} in {}s", backoff.as_secs());
                std::thread::sleep(backoff);
                backoff = next_backoff(backoff);
            }
        }
    }
}

enum Session {
    /// The receiving side is gone.
    Closed,
    /// The link failed. `received` is set if any sample got through.
    Failed { received: bool },
}

fn read_session(url: &str, events: &mpsc::Sender<ReaderEvent>) -> Session {
    let conn = match mavlink::connect::<MavMessage>(url) {
        Ok(conn) => conn,
        Err(e) => {
            warn!("MAVLink connect {url} failed: {e}");
            return Session::Failed { received: false };
        }
    };
    info!("MAVLink listening on {url}");

    let mut received = false;
    loop {
        match conn.recv() {
            Ok((_header, msg)) => {
                let Some(sample) = sample_from(&msg) else {
                    continue;
                };
                if events.blocking_send(ReaderEvent::Sample(sample)).is_err() {
                    return Session::Closed;
                }
                received = true;
            }
            Err(MessageReadError::Io(e)) => {
                warn!("MAVLink link error: {e}");
                return Session::Failed { received };
            }
            Err(e) => debug!("Skipping unreadable MAVLink message: {e:?}"),
        }
    }
}
