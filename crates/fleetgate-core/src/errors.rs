use fleetgate_canonical::ValidationError;
use fleetgate_index::IndexError;
use fleetgate_schemas::SchemaError;
use std::time::Duration;
use thiserror::Error;

use crate::signature::SignatureError;

/// Classified failure for one message or one derived envelope.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Input bytes or JSON are malformed.
    #[error("malformed input: {0}")]
    Format(String),
    /// No decoder is registered for the source identity.
    #[error("no decoder registered for source '{0}'")]
    UnknownVendor(String),
    /// A header field is missing or has invalid characters.
    #[error("validation failed: {0}")]
    Validation(ValidationError),
    /// Event type is not accepted on this path.
    #[error("unsupported event type '{0}'")]
    UnsupportedType(String),
    /// Signature is missing or unreadable, so it could not be checked.
    #[error("signature unavailable: {0}")]
    Signature(String),
    /// Signature was checked and rejected.
    #[error("invalid signature: {0}")]
    SignatureInvalid(#[from] SignatureError),
    /// Decoder failed without producing any envelope.
    #[error("conversion failed: {0}")]
    Conversion(String),
    /// Decoder returned zero envelopes.
    #[error("decoder produced no envelopes")]
    MissingOutput,
    /// Payload does not match its schema.
    #[error("payload rejected: {0}")]
    Payload(#[from] SchemaError),
    /// Index key could not be built for an already validated envelope.
    #[error("index encoding failed: {0}")]
    Index(#[from] IndexError),
    /// A bounded step did not finish in time.
    #[error("{stage} timed out after {after:?}")]
    Timeout {
        /// Which step timed out.
        stage: &'static str,
        /// Configured limit.
        after: Duration,
    },
}

impl ProcessingError {
    /// False only for internal contract violations; everything else is a
    /// data-quality failure attributable to the input.
    pub fn is_data_quality(&self) -> bool {
        !matches!(self, ProcessingError::Index(_))
    }
}

impl From<ValidationError> for ProcessingError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnsupportedType(event_type) => {
                ProcessingError::UnsupportedType(event_type)
            }
            other => ProcessingError::Validation(other),
        }
    }
}
