use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use crate::errors::ProcessingError;

/// A message, or one envelope derived from it, that could not be processed.
#[derive(Debug)]
pub struct FailedMessage {
    /// Original inbound payload.
    pub payload: Vec<u8>,
    /// Name of the processing path that failed.
    pub processor: &'static str,
    /// Classified failure.
    pub error: ProcessingError,
}

impl FailedMessage {
    /// Human-readable cause.
    pub fn cause(&self) -> String {
        self.error.to_string()
    }

    /// Flattened record suitable for serialization.
    pub fn record(&self) -> FailureRecord {
        FailureRecord {
            processor: self.processor,
            cause: self.cause(),
            data_quality: self.error.is_data_quality(),
            payload: String::from_utf8_lossy(&self.payload).into_owned(),
        }
    }
}

/// Serializable view of a [`FailedMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// Processing path.
    pub processor: &'static str,
    /// Human-readable cause.
    pub cause: String,
    /// False for internal contract violations.
    pub data_quality: bool,
    /// Original payload, lossily decoded as UTF-8.
    pub payload: String,
}

/// Destination for failed messages.
pub trait ErrorSink: Send + Sync {
    /// Accepts one failure.
    fn publish(&self, failed: FailedMessage);
}

/// Collects failures in memory.
#[derive(Debug, Default)]
pub struct VecErrorSink {
    failed: Mutex<Vec<FailedMessage>>,
}

impl VecErrorSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything collected so far.
    pub fn drain(&self) -> Vec<FailedMessage> {
        std::mem::take(&mut *self.failed.lock())
    }

    /// Number of collected failures.
    pub fn len(&self) -> usize {
        self.failed.lock().len()
    }

    /// True when nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.failed.lock().is_empty()
    }
}

impl ErrorSink for VecErrorSink {
    fn publish(&self, failed: FailedMessage) {
        self.failed.lock().push(failed);
    }
}

/// Logs failures at `warn` and drops them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn publish(&self, failed: FailedMessage) {
        warn!(
            processor = failed.processor,
            data_quality = failed.error.is_data_quality(),
            cause = %failed.error,
            "message failed"
        );
    }
}
