//! Debounced battery-level announcements.
//!
//! Battery telemetry jitters around decile boundaries, so announcements
//! fire on decile changes rather than on every reading. A drop of one
//! decile fires; a rise has to skip at least one decile before it fires.

const NOTIFY_EVERY_PERCENT: f64 = 10.0;

/// Decile bucket for a battery percentage: `floor((percent - 1) / 10)`.
///
/// 91..=100 → 9, 81..=90 → 8, ..., 1..=10 → 0, and zero or below gives
/// negative buckets.
pub fn decile(battery_percent: f64) -> i64 {
    ((battery_percent - 1.0) / NOTIFY_EVERY_PERCENT).floor() as i64
}

#[derive(Debug, Clone, Default)]
pub struct BatteryDebouncer {
    last_decile: i64,
}

impl BatteryDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the last announced decile. Called when a new connection starts.
    pub fn reset(&mut self) {
        self.last_decile = 0;
    }

    pub fn last_decile(&self) -> i64 {
        self.last_decile
    }

    /// Feed one reading; returns the announcement if it crosses a decile.
    pub fn observe(&mut self, battery_percent: f64) -> Option<String> {
        let decile = decile(battery_percent);
        if self.last_decile > decile || self.last_decile.saturating_add(1) < decile {
            self.last_decile = decile;
            Some(format!("Battery at {}%", battery_percent as i64))
        } else {
            None
        }
    }
}
