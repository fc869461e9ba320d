//! Configuration management for vehicle-voice.
//!
//! Loads config from YAML files in standard locations. Every section
//! falls back to defaults field by field, so a partial file is fine.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::prefs::PeriodicField;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Initial value of the audible-notifications preference.
    pub enabled: bool,
    /// `http` (local TTS service) or `log` (print utterances to stdout).
    pub backend: String,
    pub api_url: String,
    pub request_timeout_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "http".into(),
            api_url: "http://127.0.0.1:8767".into(),
            request_timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PeriodicConfig {
    /// Seconds between status digests, 0 disables them.
    pub interval_secs: u32,
    pub fields: Vec<String>,
}

impl Default for PeriodicConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            fields: PeriodicField::ALL.iter().map(|f| f.name().to_string()).collect(),
        }
    }
}

impl PeriodicConfig {
    /// Field names that don't match a known field are ignored.
    pub fn parsed_fields(&self) -> BTreeSet<PeriodicField> {
        self.fields
            .iter()
            .filter_map(|name| {
                let field = PeriodicField::from_name(name);
                if field.is_none() {
                    warn!("Ignoring unknown periodic field: {name}");
                }
                field
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// MAVLink connection string, e.g. `udpin:0.0.0.0:14550` or `serial:/dev/ttyUSB0:57600`.
    pub url: String,
    pub heartbeat_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            url: "udpin:0.0.0.0:14550".into(),
            heartbeat_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub notifications: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            notifications: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8768,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// Empty means `~/.vehicle-voice-history`.
    pub dir: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: String::new(),
        }
    }
}

impl HistoryConfig {
    pub fn resolve_dir(&self) -> PathBuf {
        if !self.dir.is_empty() {
            return PathBuf::from(&self.dir);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vehicle-voice-history")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub speech: SpeechConfig,
    pub periodic: PeriodicConfig,
    pub link: LinkConfig,
    pub feedback: FeedbackConfig,
    pub api: ApiConfig,
    pub history: HistoryConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/vehicle-voice/config.yaml
    /// 3. /etc/vehicle-voice/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/vehicle-voice/config.yaml")),
                Some(PathBuf::from("/etc/vehicle-voice/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    /// Sanity checks for `vehicle-voice check`.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            matches!(self.speech.backend.as_str(), "http" | "log"),
            "speech.backend must be \"http\" or \"log\", got {:?}",
            self.speech.backend
        );
        if self.speech.backend == "http" {
            anyhow::ensure!(!self.speech.api_url.is_empty(), "speech.api_url missing");
            anyhow::ensure!(self.speech.request_timeout_ms > 0, "speech.request_timeout_ms must be > 0");
        }
        anyhow::ensure!(!self.link.url.is_empty(), "link.url missing");
        anyhow::ensure!(
            self.link.heartbeat_timeout_ms >= 500,
            "link.heartbeat_timeout_ms too small (< 500)"
        );
        anyhow::ensure!(self.api.port != 0 || !self.api.enabled, "api.port must be set");
        Ok(())
    }
}
