//! The single speech gate every utterance passes through.
//!
//! An utterance reaches the sink only if it is non-empty, the sink is
//! available and the audible preference is on. Anything else is dropped,
//! never queued or retried.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::events::EventKind;
use crate::history::{HistoryLog, SpeechRecord};
use crate::prefs::PreferenceStore;
use crate::speech::SpeechSink;

/// Where an utterance came from. Recorded in the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceSource {
    Event(EventKind),
    Battery,
    Periodic,
    Quick,
}

impl fmt::Display for UtteranceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(kind) => write!(f, "{kind}"),
            Self::Battery => write!(f, "battery"),
            Self::Periodic => write!(f, "periodic"),
            Self::Quick => write!(f, "quick"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Empty,
    SinkUnavailable,
    Muted,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::SinkUnavailable => "sink_unavailable",
            Self::Muted => "muted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Spoken,
    Dropped(DropReason),
}

pub struct Announcer {
    sink: Arc<dyn SpeechSink>,
    prefs: Arc<dyn PreferenceStore>,
    history: Option<HistoryLog>,
    spoken: AtomicU64,
    dropped: AtomicU64,
}

impl Announcer {
    pub fn new(sink: Arc<dyn SpeechSink>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            sink,
            prefs,
            history: None,
            spoken: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    pub fn sink_available(&self) -> bool {
        self.sink.is_available()
    }

    pub fn say(&self, source: UtteranceSource, text: &str) -> Delivery {
        let delivery = if text.trim().is_empty() {
            Delivery::Dropped(DropReason::Empty)
        } else if !self.sink.is_available() {
            Delivery::Dropped(DropReason::SinkUnavailable)
        } else if !self.prefs.audible_enabled() {
            Delivery::Dropped(DropReason::Muted)
        } else {
            self.sink.speak(text, true);
            Delivery::Spoken
        };

        let reason = match delivery {
            Delivery::Spoken => {
                self.spoken.fetch_add(1, Ordering::Relaxed);
                None
            }
            Delivery::Dropped(reason) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Dropped {source} utterance ({}): {text:?}", reason.as_str());
                Some(reason.as_str())
            }
        };

        if let Some(history) = &self.history {
            if delivery != Delivery::Dropped(DropReason::Empty) {
                history.append(&SpeechRecord::now(&source.to_string(), text, reason));
            }
        }

        delivery
    }

    pub fn spoken_count(&self) -> u64 {
        self.spoken.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
