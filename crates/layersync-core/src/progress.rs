//! Progress and feedback reporting.
//!
//! The sink is purely observational: informational messages and a 0-100
//! progress value. It also carries the cooperative cancellation flag the
//! orchestrator polls at phase boundaries. Mid-phase cancellation is not
//! supported, and an in-flight edit session always runs to commit or
//! rollback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Observer for informational messages, progress, and cancellation.
pub trait ProgressSink {
    /// Receive an informational message.
    fn push_info(&self, _message: &str) {}

    /// Receive a progress value in the 0–100 range.
    fn set_progress(&self, _percent: u8) {}

    /// True if the host requested cancellation. Checked between phases.
    fn is_canceled(&self) -> bool {
        false
    }
}

/// Sink that discards everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// Sink that forwards to the tracing subscriber.
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn push_info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn set_progress(&self, percent: u8) {
        tracing::debug!(percent, "progress");
    }
}

/// Capturing sink for test assertions, with a settable cancellation flag.
#[derive(Default)]
pub struct CaptureProgress {
    messages: Mutex<Vec<String>>,
    progress: Mutex<Vec<u8>>,
    canceled: AtomicBool,
}

impl CaptureProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the cancellation flag.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Messages received so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Progress values received so far.
    pub fn progress_values(&self) -> Vec<u8> {
        self.progress.lock().unwrap().clone()
    }
}

impl ProgressSink for CaptureProgress {
    fn push_info(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn set_progress(&self, percent: u8) {
        self.progress.lock().unwrap().push(percent);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_never_cancels() {
        assert!(!NullProgress.is_canceled());
        NullProgress.push_info("ignored");
        NullProgress.set_progress(50);
    }

    #[test]
    fn test_capture_sink_records_everything() {
        let sink = CaptureProgress::new();
        sink.push_info("one");
        sink.push_info("two");
        sink.set_progress(10);
        sink.set_progress(100);

        assert_eq!(sink.messages(), ["one", "two"]);
        assert_eq!(sink.progress_values(), [10, 100]);
        assert!(!sink.is_canceled());
        sink.cancel();
        assert!(sink.is_canceled());
    }
}
