//! Visual feedback for mission events, via notify-rust (D-Bus).

use notify_rust::Notification;
use tracing::{debug, warn};

pub trait ToastSink: Send + Sync {
    fn show(&self, text: &str);
}

pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl ToastSink for DesktopNotifier {
    fn show(&self, text: &str) {
        if !self.enabled {
            return;
        }

        debug!("Toast: {text}");

        if let Err(e) = Notification::new()
            .summary("Vehicle")
            .body(text)
            .icon("dialog-information")
            .timeout(3000)
            .show()
        {
            warn!("Failed to show notification: {e}");
        }
    }
}
