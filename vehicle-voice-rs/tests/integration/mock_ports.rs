//! Recording adapters for the facade's ports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use vehicle_voice::announcer::Announcer;
use vehicle_voice::events::{EventKind, VehicleEvent};
use vehicle_voice::facade::NotificationFacade;
use vehicle_voice::link::CalibrationFlag;
use vehicle_voice::notifier::ToastSink;
use vehicle_voice::prefs::{PeriodicField, SharedPreferences};
use vehicle_voice::speech::SpeechSink;
use vehicle_voice::vehicle::{SharedVehicle, VehicleSnapshot};

// ── Speech ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
    unavailable: AtomicBool,
}

#[allow(dead_code)]
impl RecordingSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.spoken.lock().unwrap().clear();
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }
}

impl SpeechSink for RecordingSpeech {
    fn speak(&self, text: &str, flush_pending: bool) {
        assert!(flush_pending, "every announcement supersedes the pending one");
        self.spoken.lock().unwrap().push(text.to_string());
    }

    fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::Relaxed)
    }
}

// ── Toasts ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingToasts(Mutex<Vec<String>>);

impl RecordingToasts {
    pub fn shown(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl ToastSink for RecordingToasts {
    fn show(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Harness {
    pub facade: NotificationFacade,
    pub speech: Arc<RecordingSpeech>,
    pub toasts: Arc<RecordingToasts>,
    pub prefs: Arc<SharedPreferences>,
    pub calibration: CalibrationFlag,
    pub vehicle: SharedVehicle,
}

#[allow(dead_code)]
impl Harness {
    /// Audible, periodic digest off, every field enabled.
    pub fn new() -> Self {
        let speech = Arc::new(RecordingSpeech::default());
        let toasts = Arc::new(RecordingToasts::default());
        let prefs = Arc::new(SharedPreferences::default());
        prefs.set_audible(true);
        prefs.set_periodic_fields(PeriodicField::ALL);
        let calibration = CalibrationFlag::default();
        let vehicle = SharedVehicle::default();

        let announcer = Arc::new(Announcer::new(speech.clone(), prefs.clone()));
        let facade = NotificationFacade::new(
            announcer,
            toasts.clone(),
            prefs.clone(),
            Arc::new(calibration.clone()),
            vehicle.clone(),
        );

        Self {
            facade,
            speech,
            toasts,
            prefs,
            calibration,
            vehicle,
        }
    }

    /// Fire `kind` with the current vehicle snapshot.
    pub fn fire(&mut self, kind: EventKind) {
        let event = VehicleEvent::new(kind, self.vehicle.snapshot());
        self.facade.on_event(&event);
    }

    /// Update the vehicle, then fire `kind`.
    pub fn fire_with(&mut self, kind: EventKind, edit: impl FnOnce(&mut VehicleSnapshot)) {
        self.vehicle.update(edit);
        self.fire(kind);
    }
}
