//! Inbound vehicle events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vehicle::VehicleSnapshot;

/// Every vehicle event kind the notification core recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Arming,
    ArmingStarted,
    Battery,
    Mode,
    MissionSent,
    GpsFix,
    MissionReceived,
    HeartbeatFirst,
    HeartbeatTimeout,
    HeartbeatRestored,
    Disconnected,
    MissionWpUpdate,
    FollowStart,
    PeriodicSpeech,
    Failsafe,
    InvalidPolygon,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arming => "ARMING",
            Self::ArmingStarted => "ARMING_STARTED",
            Self::Battery => "BATTERY",
            Self::Mode => "MODE",
            Self::MissionSent => "MISSION_SENT",
            Self::GpsFix => "GPS_FIX",
            Self::MissionReceived => "MISSION_RECEIVED",
            Self::HeartbeatFirst => "HEARTBEAT_FIRST",
            Self::HeartbeatTimeout => "HEARTBEAT_TIMEOUT",
            Self::HeartbeatRestored => "HEARTBEAT_RESTORED",
            Self::Disconnected => "DISCONNECTED",
            Self::MissionWpUpdate => "MISSION_WP_UPDATE",
            Self::FollowStart => "FOLLOW_START",
            Self::PeriodicSpeech => "PERIODIC_SPEECH",
            Self::Failsafe => "FAILSAFE",
            Self::InvalidPolygon => "INVALID_POLYGON",
        }
    }

    /// Heartbeat lifecycle kinds, owned by the connection gate.
    pub fn is_link_event(self) -> bool {
        matches!(
            self,
            Self::HeartbeatFirst
                | Self::HeartbeatTimeout
                | Self::HeartbeatRestored
                | Self::Disconnected
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vehicle event plus the telemetry as it stood when the event fired.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleEvent {
    pub kind: EventKind,
    pub vehicle: VehicleSnapshot,
}

impl VehicleEvent {
    pub fn new(kind: EventKind, vehicle: VehicleSnapshot) -> Self {
        Self { kind, vehicle }
    }
}
