//! Utterance history and reporting.
//!
//! Stores one JSON line per announcement decision (spoken or dropped) in
//! `<dir>/{date}-speech.jsonl`.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechRecord {
    pub timestamp: String,
    pub source: String,
    pub text: String,
    pub spoken: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_reason: Option<String>,
}

impl SpeechRecord {
    pub fn now(source: &str, text: &str, dropped_reason: Option<&str>) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            source: source.to_string(),
            text: text.to_string(),
            spoken: dropped_reason.is_none(),
            dropped_reason: dropped_reason.map(str::to_string),
        }
    }

    fn date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or("unknown")
    }
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    dir: PathBuf,
}

impl HistoryLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, date: &str) -> PathBuf {
        self.dir.join(format!("{date}-speech.jsonl"))
    }

    /// Append a record. Failures are logged, never returned.
    pub fn append(&self, record: &SpeechRecord) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!("Failed to create speech history dir {}: {e}", self.dir.display());
            return;
        }

        let path = self.file_for(record.date());
        let mut file = match fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to open speech history file {}: {e}", path.display());
                return;
            }
        };

        match serde_json::to_string(record) {
            Ok(line) => {
                if let Err(e) = writeln!(file, "{line}") {
                    warn!("Failed to write speech history record: {e}");
                }
            }
            Err(e) => warn!("Failed to serialize speech record: {e}"),
        }
    }

    pub fn load(&self, date: &str) -> Vec<SpeechRecord> {
        let Ok(contents) = fs::read_to_string(self.file_for(date)) else {
            return Vec::new();
        };
        contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn list_dates(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut dates: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_suffix("-speech.jsonl").map(str::to_string)
            })
            .collect();
        dates.sort();
        dates
    }

    pub fn report(&self, date: &str) -> String {
        let records = self.load(date);
        if records.is_empty() {
            return format!("No speech records for {date}.");
        }

        let total = records.len();
        let spoken = records.iter().filter(|r| r.spoken).count();
        let dropped = total - spoken;

        let mut by_source: BTreeMap<&str, usize> = BTreeMap::new();
        for r in &records {
            *by_source.entry(r.source.as_str()).or_insert(0) += 1;
        }
        let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
        for r in records.iter().filter_map(|r| r.dropped_reason.as_deref()) {
            *by_reason.entry(r).or_insert(0) += 1;
        }

        let mut report = format!(
            "# Speech report for {date}\n\n\
            - Total: {total}\n\
            - Spoken: {spoken}\n\
            - Dropped: {dropped}\n\n\
            ## Sources\n"
        );
        for (source, count) in &by_source {
            report.push_str(&format!("- {source}: {count}\n"));
        }
        if !by_reason.is_empty() {
            report.push_str("\n## Drop reasons\n");
            for (reason, count) in &by_reason {
                report.push_str(&format!("- {reason}: {count}\n"));
            }
        }
        report
    }
}
