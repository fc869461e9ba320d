//! Periodic status digest.
//!
//! A one-shot timer that re-arms itself after each tick with the interval
//! read at that moment. Every arm gets a fresh generation number; a tick
//! whose generation is no longer current does nothing, so a tick racing a
//! cancel or restart is harmless and at most one timer is ever live.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::announcer::{Announcer, UtteranceSource};
use crate::prefs::{PeriodicField, PreferenceStore};
use crate::vehicle::{SharedVehicle, VehicleSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchedulerState {
    #[default]
    Idle,
    Scheduled { interval_secs: u32, generation: u64 },
}

#[derive(Default)]
struct Inner {
    state: SchedulerState,
    generation: u64,
    vehicle: Option<SharedVehicle>,
    task: Option<JoinHandle<()>>,
    ticks: u64,
}

impl Inner {
    /// Invalidate any pending tick and go idle.
    fn disarm(&mut self) {
        self.generation += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state = SchedulerState::Idle;
    }
}

#[derive(Clone)]
pub struct PeriodicScheduler {
    inner: Arc<Mutex<Inner>>,
    announcer: Arc<Announcer>,
    prefs: Arc<dyn PreferenceStore>,
}

impl PeriodicScheduler {
    pub fn new(announcer: Arc<Announcer>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            announcer,
            prefs,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SchedulerState {
        self.lock().state
    }

    pub fn ticks_fired(&self) -> u64 {
        self.lock().ticks
    }

    /// Bind `vehicle` and (re)arm for `interval_secs`. Zero cancels.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval_secs: u32, vehicle: SharedVehicle) {
        let mut inner = self.lock();
        inner.vehicle = Some(vehicle);
        inner.disarm();
        if interval_secs == 0 {
            info!("Periodic status disabled");
            return;
        }
        info!("Periodic status every {interval_secs}s");
        self.arm(&mut inner, interval_secs);
    }

    pub fn cancel(&self) {
        let mut inner = self.lock();
        if inner.state != SchedulerState::Idle {
            info!("Periodic status cancelled");
        }
        inner.disarm();
    }

    fn arm(&self, inner: &mut Inner, interval_secs: u32) {
        inner.generation += 1;
        let generation = inner.generation;
        let this = self.clone();
        inner.task = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(interval_secs))).await;
            this.on_tick(generation);
        }));
        inner.state = SchedulerState::Scheduled {
            interval_secs,
            generation,
        };
    }

    /// Run the tick armed as `generation`. Returns false for a stale tick.
    ///
    /// The digest is composed and the timer re-armed under the lock; the
    /// utterance is emitted after the lock is released.
    pub fn on_tick(&self, generation: u64) -> bool {
        let Some(text) = self.advance(generation) else {
            return false;
        };
        self.announcer.say(UtteranceSource::Periodic, &text);
        true
    }

    fn advance(&self, generation: u64) -> Option<String> {
        let mut inner = self.lock();
        match inner.state {
            SchedulerState::Scheduled { generation: current, .. } if current == generation => {}
            _ => {
                debug!("Ignoring stale periodic tick (generation {generation})");
                return None;
            }
        }
        // This is the running task; let it finish instead of aborting it.
        drop(inner.task.take());
        inner.ticks += 1;
        info!("Periodic status #{}", inner.ticks);

        let flags = self.prefs.snapshot();
        let vehicle = inner
            .vehicle
            .as_ref()
            .map(SharedVehicle::snapshot)
            .unwrap_or_default();
        let text = compose_status(&flags.periodic_fields, &vehicle);

        if flags.periodic_interval_secs == 0 {
            info!("Periodic status interval now 0, going idle");
            inner.disarm();
        } else {
            self.arm(&mut inner, flags.periodic_interval_secs);
        }
        Some(text)
    }
}

/// Truncate toward zero at one decimal place.
fn one_decimal(value: f64) -> f64 {
    (value * 10.0).trunc() / 10.0
}

/// Build the digest text for the enabled fields, in fixed field order.
pub fn compose_status(fields: &BTreeSet<PeriodicField>, vehicle: &VehicleSnapshot) -> String {
    let mut text = String::new();
    for field in PeriodicField::ALL.into_iter().filter(|f| fields.contains(f)) {
        // Writing to a String cannot fail.
        let _ = match field {
            PeriodicField::BatteryVoltage => {
                write!(text, "battery {:.2} volts. ", vehicle.battery_voltage)
            }
            PeriodicField::Altitude => {
                write!(text, "altitude, {:.1} meters. ", one_decimal(vehicle.altitude))
            }
            PeriodicField::Airspeed => write!(
                text,
                "airspeed, {:.1} meters per second. ",
                one_decimal(vehicle.airspeed)
            ),
            PeriodicField::Rssi => write!(text, "r s s i, {} decibels", vehicle.rssi),
        };
    }
    text
}
