//! Live user preferences.
//!
//! Preferences are read through [`PreferenceStore`] at every decision
//! point instead of being cached, so changes made while the service runs
//! (over the control API) apply to the next event or periodic tick.

use std::collections::BTreeSet;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Telemetry fields that can be included in the periodic status digest.
///
/// Declaration order is the order clauses are spoken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicField {
    BatteryVoltage,
    Altitude,
    Airspeed,
    Rssi,
}

impl PeriodicField {
    pub const ALL: [Self; 4] = [
        Self::BatteryVoltage,
        Self::Altitude,
        Self::Airspeed,
        Self::Rssi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BatteryVoltage => "battery_voltage",
            Self::Altitude => "altitude",
            Self::Airspeed => "airspeed",
            Self::Rssi => "rssi",
        }
    }

    /// Accepts the snake_case name or the spaced form ("battery voltage").
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace(' ', "_");
        Self::ALL.into_iter().find(|f| f.name() == normalized)
    }
}

/// Point-in-time copy of every preference the notification core reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreferenceFlags {
    pub tts_enabled: bool,
    /// 0 disables the periodic status digest.
    pub periodic_interval_secs: u32,
    pub periodic_fields: BTreeSet<PeriodicField>,
}

impl PreferenceFlags {
    /// A field missing from the set counts as disabled.
    pub fn field_enabled(&self, field: PeriodicField) -> bool {
        self.periodic_fields.contains(&field)
    }
}

pub trait PreferenceStore: Send + Sync {
    fn audible_enabled(&self) -> bool;

    fn periodic_interval_secs(&self) -> u32;

    fn periodic_fields(&self) -> BTreeSet<PeriodicField>;

    fn snapshot(&self) -> PreferenceFlags {
        PreferenceFlags {
            tts_enabled: self.audible_enabled(),
            periodic_interval_secs: self.periodic_interval_secs(),
            periodic_fields: self.periodic_fields(),
        }
    }
}

/// In-memory preference store shared between the facade, the scheduler
/// and the control API.
#[derive(Debug, Default)]
pub struct SharedPreferences {
    flags: RwLock<PreferenceFlags>,
}

impl SharedPreferences {
    pub fn new(flags: PreferenceFlags) -> Self {
        Self {
            flags: RwLock::new(flags),
        }
    }

    /// Seed the live preferences from the config file.
    pub fn from_config(config: &Config) -> Self {
        Self::new(PreferenceFlags {
            tts_enabled: config.speech.enabled,
            periodic_interval_secs: config.periodic.interval_secs,
            periodic_fields: config.periodic.parsed_fields(),
        })
    }

    pub fn update(&self, f: impl FnOnce(&mut PreferenceFlags)) {
        let mut flags = self.flags.write().unwrap_or_else(|e| e.into_inner());
        f(&mut flags);
    }

    pub fn set_audible(&self, enabled: bool) {
        self.update(|p| p.tts_enabled = enabled);
    }

    pub fn set_periodic_interval(&self, secs: u32) {
        self.update(|p| p.periodic_interval_secs = secs);
    }

    pub fn set_periodic_fields(&self, fields: impl IntoIterator<Item = PeriodicField>) {
        let fields: BTreeSet<_> = fields.into_iter().collect();
        self.update(|p| p.periodic_fields = fields);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PreferenceFlags> {
        self.flags.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for SharedPreferences {
    fn audible_enabled(&self) -> bool {
        self.read().tts_enabled
    }

    fn periodic_interval_secs(&self) -> u32 {
        self.read().periodic_interval_secs
    }

    fn periodic_fields(&self) -> BTreeSet<PeriodicField> {
        self.read().periodic_fields.clone()
    }

    fn snapshot(&self) -> PreferenceFlags {
        self.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_parse_both_spellings() {
        assert_eq!(PeriodicField::from_name("battery voltage"), Some(PeriodicField::BatteryVoltage));
        assert_eq!(PeriodicField::from_name("RSSI"), Some(PeriodicField::Rssi));
        assert_eq!(PeriodicField::from_name("groundspeed"), None);
    }

    #[test]
    fn updates_are_visible_to_next_read() {
        let prefs = SharedPreferences::default();
        assert!(!prefs.audible_enabled());
        assert!(!prefs.snapshot().field_enabled(PeriodicField::Altitude));

        prefs.set_audible(true);
        prefs.set_periodic_interval(15);
        prefs.set_periodic_fields([PeriodicField::Altitude]);

        let flags = prefs.snapshot();
        assert!(flags.tts_enabled);
        assert_eq!(flags.periodic_interval_secs, 15);
        assert!(flags.field_enabled(PeriodicField::Altitude));
        assert!(!flags.field_enabled(PeriodicField::Rssi));
    }
}
