//! Notification facade: the one entry point for vehicle events.
//!
//! A single consumer owns the facade and feeds it [`Inbound`] messages in
//! order. Deciding what to say is delegated to the translator, the
//! connection gate and the battery debouncer; saying it always goes
//! through the [`Announcer`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::announcer::{Announcer, UtteranceSource};
use crate::battery::BatteryDebouncer;
use crate::events::{EventKind, VehicleEvent};
use crate::link::{CalibrationState, ConnectionGate, GateAction, LinkState};
use crate::notifier::ToastSink;
use crate::prefs::PreferenceStore;
use crate::scheduler::PeriodicScheduler;
use crate::translator::translate;
use crate::vehicle::SharedVehicle;

/// Work queued for the facade loop.
#[derive(Debug, Clone)]
pub enum Inbound {
    Event(VehicleEvent),
    QuickNotify(String),
    /// Reschedule the periodic digest, e.g. after the interval preference changed.
    SetupPeriodic { interval_secs: u32 },
}

pub struct NotificationFacade {
    announcer: Arc<Announcer>,
    toasts: Arc<dyn ToastSink>,
    prefs: Arc<dyn PreferenceStore>,
    calibration: Arc<dyn CalibrationState>,
    vehicle: SharedVehicle,
    gate: ConnectionGate,
    battery: BatteryDebouncer,
    scheduler: PeriodicScheduler,
    link_tx: watch::Sender<LinkState>,
}

impl NotificationFacade {
    pub fn new(
        announcer: Arc<Announcer>,
        toasts: Arc<dyn ToastSink>,
        prefs: Arc<dyn PreferenceStore>,
        calibration: Arc<dyn CalibrationState>,
        vehicle: SharedVehicle,
    ) -> Self {
        let scheduler = PeriodicScheduler::new(announcer.clone(), prefs.clone());
        let (link_tx, _) = watch::channel(LinkState::default());
        Self {
            announcer,
            toasts,
            prefs,
            calibration,
            vehicle,
            gate: ConnectionGate::new(),
            battery: BatteryDebouncer::new(),
            scheduler,
            link_tx,
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.gate.state()
    }

    /// Follow link state changes from outside the facade loop.
    pub fn subscribe_link(&self) -> watch::Receiver<LinkState> {
        self.link_tx.subscribe()
    }

    /// Handle to the periodic scheduler, for status reporting.
    pub fn scheduler(&self) -> PeriodicScheduler {
        self.scheduler.clone()
    }

    pub fn on_event(&mut self, event: &VehicleEvent) {
        debug!("Event {}", event.kind);
        match event.kind {
            EventKind::Battery => {
                if let Some(text) = self.battery.observe(event.vehicle.battery_remaining) {
                    self.announcer.say(UtteranceSource::Battery, &text);
                }
            }
            kind if kind.is_link_event() => self.on_link_event(kind),
            kind => {
                let translation = translate(event);
                if let Some(text) = &translation.utterance {
                    self.announcer.say(UtteranceSource::Event(kind), text);
                }
                if let Some(toast) = &translation.toast {
                    self.toasts.show(toast);
                }
            }
        }
    }

    fn on_link_event(&mut self, kind: EventKind) {
        if kind == EventKind::HeartbeatFirst {
            self.battery.reset();
        }

        match self.gate.on_event(kind, self.calibration.is_calibrating()) {
            GateAction::Ignore | GateAction::Suppressed => return,
            GateAction::StartPeriodic { announce } => {
                let interval = self.prefs.periodic_interval_secs();
                self.scheduler.start(interval, self.vehicle.clone());
                self.announcer.say(UtteranceSource::Event(kind), announce);
            }
            GateAction::StopPeriodic { announce } => {
                self.scheduler.cancel();
                if let Some(text) = announce {
                    self.announcer.say(UtteranceSource::Event(kind), text);
                }
            }
        }
        self.link_tx.send_replace(self.gate.state());
    }

    pub fn quick_notify(&self, text: &str) {
        self.announcer.say(UtteranceSource::Quick, text);
    }

    pub fn setup_periodic_speech_output(&self, interval_secs: u32, vehicle: SharedVehicle) {
        self.scheduler.start(interval_secs, vehicle);
    }

    pub fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::Event(event) => self.on_event(&event),
            Inbound::QuickNotify(text) => self.quick_notify(&text),
            Inbound::SetupPeriodic { interval_secs } => {
                if self.gate.state() == LinkState::Connected {
                    self.setup_periodic_speech_output(interval_secs, self.vehicle.clone());
                } else {
                    debug!("Not connected, periodic status will start on connect");
                }
            }
        }
    }

    /// Process inbound messages until every sender is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Inbound>) {
        info!("Notification facade ready");
        while let Some(message) = rx.recv().await {
            self.handle(message);
        }
        self.scheduler.cancel();
        info!("Inbound channel closed, notification facade stopped");
    }
}
