//! Status display sink

/// A single-line status display
///
/// Writing an empty string clears it.
pub trait StatusDisplay: Send + Sync {
    /// Replace the displayed text
    fn set(&self, text: &str);

    /// Clear the display
    fn clear(&self) {
        self.set("");
    }
}

/// Status display that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

impl StatusDisplay for LogStatus {
    fn set(&self, text: &str) {
        if text.is_empty() {
            tracing::debug!("status cleared");
        } else {
            tracing::info!(status = text, "status");
        }
    }
}
