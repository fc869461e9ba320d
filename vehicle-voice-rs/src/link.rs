//! Connection-health gate.
//!
//! ```text
//! DISCONNECTED ─HEARTBEAT_FIRST─▶ CONNECTED ─HEARTBEAT_TIMEOUT─▶ LINK_LOST
//!      ▲                              ▲                              │
//!      └──────── DISCONNECTED ────────┴──── HEARTBEAT_RESTORED ──────┘
//! ```
//!
//! DISCONNECTED and HEARTBEAT_FIRST apply from any state. A timeout only
//! counts while connected and a restore only after an announced loss.
//!
//! The gate only decides; the facade carries out the returned
//! [`GateAction`] (scheduler restart or cancel, announcement).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::events::EventKind;

pub const CONNECTED: &str = "Connected";
pub const LINK_LOST: &str = "Data link lost, check connection.";
pub const LINK_RESTORED: &str = "Data link restored";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
    LinkLost,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connected => write!(f, "CONNECTED"),
            Self::LinkLost => write!(f, "LINK_LOST"),
        }
    }
}

/// Whether a sensor calibration is running. Calibration stalls heartbeats
/// on purpose, so link loss during it is not announced.
pub trait CalibrationState: Send + Sync {
    fn is_calibrating(&self) -> bool;
}

/// Calibration flag settable from the control API.
#[derive(Debug, Clone, Default)]
pub struct CalibrationFlag {
    active: Arc<AtomicBool>,
}

impl CalibrationFlag {
    pub fn set(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }
}

impl CalibrationState for CalibrationFlag {
    fn is_calibrating(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Side effects requested by a link transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    /// Not a link event, or not a transition out of the current state.
    Ignore,
    /// Heartbeat loss during calibration: change nothing.
    Suppressed,
    /// (Re)start the periodic scheduler with the live interval, then announce.
    StartPeriodic { announce: &'static str },
    /// Cancel the periodic scheduler, optionally announcing.
    StopPeriodic { announce: Option<&'static str> },
}

#[derive(Debug, Default)]
pub struct ConnectionGate {
    state: LinkState,
}

impl ConnectionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn on_event(&mut self, kind: EventKind, calibrating: bool) -> GateAction {
        let (next, action) = match kind {
            EventKind::HeartbeatFirst => (
                LinkState::Connected,
                GateAction::StartPeriodic { announce: CONNECTED },
            ),
            EventKind::HeartbeatTimeout if self.state != LinkState::Connected => {
                return GateAction::Ignore
            }
            EventKind::HeartbeatTimeout if calibrating => {
                info!("Heartbeat timeout during calibration, ignoring");
                return GateAction::Suppressed;
            }
            EventKind::HeartbeatTimeout => (
                LinkState::LinkLost,
                GateAction::StopPeriodic {
                    announce: Some(LINK_LOST),
                },
            ),
            // Only a loss that was announced gets a restore.
            EventKind::HeartbeatRestored if self.state != LinkState::LinkLost => {
                return GateAction::Ignore
            }
            EventKind::HeartbeatRestored => (
                LinkState::Connected,
                GateAction::StartPeriodic {
                    announce: LINK_RESTORED,
                },
            ),
            EventKind::Disconnected => (
                LinkState::Disconnected,
                GateAction::StopPeriodic { announce: None },
            ),
            _ => return GateAction::Ignore,
        };

        if next != self.state {
            info!("Link: {} → {}", self.state, next);
        }
        self.state = next;
        action
    }
}
