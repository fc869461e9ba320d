//! Speech output backends.
//!
//! The notification core only needs `speak` and `is_available`. The HTTP
//! backend forwards utterances to a local TTS service exposing `/status`,
//! `/speak` and `/cancel`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::SpeechConfig;
use crate::notifier::ToastSink;

const QUEUE_DEPTH: usize = 32;

pub const SPEECH_UNAVAILABLE: &str =
    "Speech unavailable, make sure the text-to-speech service is running";

pub trait SpeechSink: Send + Sync {
    /// Queue `text` for synthesis. With `flush_pending`, anything still
    /// queued or playing is discarded first.
    fn speak(&self, text: &str, flush_pending: bool);

    /// False when the engine failed to initialise or went away.
    fn is_available(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech service request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("speech service returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("speech service is up but has no voice model loaded")]
    NotReady,
}

#[derive(Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
    event_type: &'a str,
}

#[derive(Deserialize)]
struct StatusResponse {
    model_loaded: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Utterance {
    text: String,
    flush_pending: bool,
}

/// Utterances waiting for the delivery worker.
///
/// A flushing utterance replaces everything still pending, so the newest
/// one always survives. Non-flushing ones queue behind it, oldest dropped
/// first once the queue is full.
#[derive(Default)]
struct PendingQueue {
    items: Mutex<VecDeque<Utterance>>,
    ready: Notify,
}

impl PendingQueue {
    fn push(&self, utterance: Utterance) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if utterance.flush_pending {
            if !items.is_empty() {
                debug!("Superseding {} pending utterance(s)", items.len());
            }
            items.clear();
        } else if items.len() >= QUEUE_DEPTH {
            if let Some(stale) = items.pop_front() {
                warn!("Speech queue full, dropping oldest: {}", stale.text);
            }
        }
        items.push_back(utterance);
        drop(items);
        self.ready.notify_one();
    }

    fn pop(&self) -> Option<Utterance> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }

    async fn next(&self) -> Utterance {
        loop {
            if let Some(utterance) = self.pop() {
                return utterance;
            }
            self.ready.notified().await;
        }
    }
}

/// Sink availability. Losing the service pops a toast once per outage,
/// including when it was never reachable.
struct Availability {
    up: AtomicBool,
    reported: AtomicBool,
    base_url: String,
    toasts: Arc<dyn ToastSink>,
}

impl Availability {
    fn new(base_url: String, toasts: Arc<dyn ToastSink>) -> Self {
        Self {
            up: AtomicBool::new(false),
            reported: AtomicBool::new(false),
            base_url,
            toasts,
        }
    }

    fn is_up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }

    fn set(&self, up: bool) {
        let was_up = self.up.swap(up, Ordering::Relaxed);
        if up {
            if !was_up {
                info!("Speech service available at {}", self.base_url);
            }
            self.reported.store(false, Ordering::Relaxed);
        } else if !self.reported.swap(true, Ordering::Relaxed) {
            warn!("Speech service unavailable at {}", self.base_url);
            self.toasts.show(SPEECH_UNAVAILABLE);
        }
    }
}

/// Sends utterances to the TTS service over HTTP, one at a time and in order.
pub struct HttpSpeechSink {
    client: Client,
    base_url: String,
    availability: Arc<Availability>,
    queue: Arc<PendingQueue>,
}

impl HttpSpeechSink {
    /// Build the client and spawn the delivery worker. Must be called
    /// from within a tokio runtime. Starts out unavailable until
    /// [`check_status`](Self::check_status) succeeds; outages are reported on `toasts`.
    pub fn start(config: &SpeechConfig, toasts: Arc<dyn ToastSink>) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(300))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let base_url = config.api_url.trim_end_matches('/').to_string();
        let availability = Arc::new(Availability::new(base_url.clone(), toasts));
        let queue = Arc::new(PendingQueue::default());

        tokio::spawn(deliver(
            client.clone(),
            base_url.clone(),
            availability.clone(),
            queue.clone(),
        ));

        Ok(Self {
            client,
            base_url,
            availability,
            queue,
        })
    }

    /// Check that the service is up with a model loaded, and record the result.
    pub async fn check_status(&self) -> Result<(), SpeechError> {
        let result = self.fetch_status().await;
        self.availability.set(result.is_ok());
        result
    }

    /// Re-check every `every` while the service is unavailable.
    pub fn spawn_health_check(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if !self.is_available() {
                    if let Err(e) = self.check_status().await {
                        debug!("Speech service check failed: {e}");
                    }
                }
            }
        })
    }

    async fn fetch_status(&self) -> Result<(), SpeechError> {
        let response = self.client.get(format!("{}/status", self.base_url)).send().await?;
        if !response.status().is_success() {
            return Err(SpeechError::Status(response.status()));
        }
        let status: StatusResponse = response.json().await?;
        if status.model_loaded == Some(false) {
            return Err(SpeechError::NotReady);
        }
        Ok(())
    }
}

impl SpeechSink for HttpSpeechSink {
    fn speak(&self, text: &str, flush_pending: bool) {
        self.queue.push(Utterance {
            text: text.to_string(),
            flush_pending,
        });
    }

    fn is_available(&self) -> bool {
        self.availability.is_up()
    }
}

async fn deliver(
    client: Client,
    base_url: String,
    availability: Arc<Availability>,
    queue: Arc<PendingQueue>,
) {
    loop {
        let utterance = queue.next().await;
        if let Err(e) = post_utterance(&client, &base_url, &utterance).await {
            warn!("Speech delivery failed: {e}");
            availability.set(false);
        }
    }
}

async fn post_utterance(
    client: &Client,
    base_url: &str,
    utterance: &Utterance,
) -> Result<(), SpeechError> {
    if utterance.flush_pending {
        let response = client.post(format!("{base_url}/cancel")).send().await?;
        if !response.status().is_success() {
            return Err(SpeechError::Status(response.status()));
        }
    }

    let response = client
        .post(format!("{base_url}/speak"))
        .json(&SpeakRequest {
            text: &utterance.text,
            event_type: "vehicle",
        })
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(SpeechError::Status(response.status()));
    }
    debug!("Spoke: {}", utterance.text);
    Ok(())
}

/// Prints utterances to stdout. Handy without a TTS service.
#[derive(Debug, Default)]
pub struct LogSpeechSink;

impl SpeechSink for LogSpeechSink {
    fn speak(&self, text: &str, _flush_pending: bool) {
        println!("[speech] {text}");
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Toasts(Mutex<Vec<String>>);

    impl ToastSink for Toasts {
        fn show(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }
    }

    fn utterance(text: &str, flush_pending: bool) -> Utterance {
        Utterance {
            text: text.into(),
            flush_pending,
        }
    }

    fn drain(queue: &PendingQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop()).map(|u| u.text).collect()
    }

    #[test]
    fn flushing_utterance_supersedes_pending_ones() {
        let queue = PendingQueue::default();
        for n in 0..40 {
            queue.push(utterance(&format!("Battery at {n}%"), true));
        }
        assert_eq!(drain(&queue), vec!["Battery at 39%"]);
    }

    #[test]
    fn queued_utterances_drop_oldest_when_full() {
        let queue = PendingQueue::default();
        for n in 0..QUEUE_DEPTH + 2 {
            queue.push(utterance(&n.to_string(), false));
        }
        let left = drain(&queue);
        assert_eq!(left.len(), QUEUE_DEPTH);
        assert_eq!(left.first().map(String::as_str), Some("2"));
        assert_eq!(left.last(), Some(&(QUEUE_DEPTH + 1).to_string()));

        queue.push(utterance("a", false));
        queue.push(utterance("b", true));
        assert_eq!(drain(&queue), vec!["b"]);
    }

    #[tokio::test]
    async fn worker_wakes_for_new_utterances() {
        let queue = Arc::new(PendingQueue::default());
        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.next().await }
        });
        tokio::task::yield_now().await;
        queue.push(utterance("Armed", true));
        assert_eq!(waiter.await.unwrap(), utterance("Armed", true));
    }

    #[test]
    fn outage_toasts_once_until_recovered() {
        let toasts = Arc::new(Toasts::default());
        let availability = Availability::new("http://tts".into(), toasts.clone());

        availability.set(false);
        availability.set(false);
        assert_eq!(*toasts.0.lock().unwrap(), vec![SPEECH_UNAVAILABLE]);

        availability.set(true);
        assert!(availability.is_up());
        availability.set(false);
        assert_eq!(toasts.0.lock().unwrap().len(), 2);
        assert!(!availability.is_up());
    }

    #[tokio::test]
    async fn failed_startup_check_shows_a_toast() {
        let toasts = Arc::new(Toasts::default());
        let config = SpeechConfig {
            api_url: "http://127.0.0.1:9".into(),
            request_timeout_ms: 500,
            ..SpeechConfig::default()
        };
        let sink = HttpSpeechSink::start(&config, toasts.clone()).unwrap();

        assert!(sink.check_status().await.is_err());
        assert!(sink.check_status().await.is_err());
        assert!(!sink.is_available());
        assert_eq!(*toasts.0.lock().unwrap(), vec![SPEECH_UNAVAILABLE]);
    }
}
