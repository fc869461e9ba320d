//! Event → announcement mapping.
//!
//! Pure table lookup: no state, no I/O. Link lifecycle and battery events
//! translate to nothing here; the connection gate and the battery
//! debouncer own those.

use crate::events::{EventKind, VehicleEvent};
use crate::mode::FlightMode;

pub const INVALID_POLYGON_MESSAGE: &str = "Error: a polygon needs at least three points";

/// What to say and what to pop up for one event. Either side may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub utterance: Option<String>,
    pub toast: Option<String>,
}

impl Translation {
    fn say(text: impl Into<String>) -> Self {
        Self {
            utterance: Some(text.into()),
            toast: None,
        }
    }

    fn say_and_show(text: impl Into<String>, toast: impl Into<String>) -> Self {
        Self {
            utterance: Some(text.into()),
            toast: Some(toast.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.utterance.is_none() && self.toast.is_none()
    }
}

pub fn translate(event: &VehicleEvent) -> Translation {
    let vehicle = &event.vehicle;
    match event.kind {
        EventKind::Arming => Translation::say(armed_utterance(vehicle.armed)),
        EventKind::ArmingStarted => Translation::say("Arming the vehicle, please standby"),
        EventKind::Mode => Translation::say(mode_utterance(vehicle.mode)),
        EventKind::MissionSent => Translation::say_and_show("Waypoints saved to Drone", "Waypoints sent"),
        EventKind::MissionReceived => {
            Translation::say_and_show("Waypoints received", "Waypoints received from Drone")
        }
        EventKind::MissionWpUpdate => {
            Translation::say(format!("Going for waypoint {}", vehicle.current_waypoint))
        }
        EventKind::GpsFix => Translation::say(gps_utterance(vehicle.gps_fix)),
        EventKind::FollowStart => Translation::say("Following"),
        EventKind::Failsafe if vehicle.failsafe => Translation::say(vehicle.failsafe_reason.clone()),
        EventKind::InvalidPolygon => Translation {
            utterance: None,
            toast: Some(INVALID_POLYGON_MESSAGE.into()),
        },
        _ => Translation::default(),
    }
}

pub fn armed_utterance(armed: bool) -> &'static str {
    if armed {
        "Armed"
    } else {
        "Disarmed"
    }
}

pub fn mode_utterance(mode: FlightMode) -> String {
    format!("Mode {}", mode.spoken_name())
}

pub fn gps_utterance(fix: u8) -> &'static str {
    match fix {
        2 => "GPS 2D Lock",
        3 => "GPS 3D Lock",
        _ => "Lost GPS Lock",
    }
}
