//! Schema error types.

use fleetgate_canonical::ValidationError;
use thiserror::Error;

/// Errors raised while interpreting envelope payloads.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Payload bytes are not the expected JSON shape.
    #[error("payload is malformed: {0}")]
    Json(#[from] serde_json::Error),
    /// Signal value is neither a number nor a string.
    #[error("signal {name} has unsupported value {value}")]
    UnsupportedValue {
        /// Signal name.
        name: String,
        /// Offending JSON value.
        value: String,
    },
    /// Signal name is outside the restricted character class.
    #[error("invalid signal name: {0}")]
    InvalidSignalName(#[from] ValidationError),
    /// VIN failed validation.
    #[error("invalid VIN '{vin}': {reason}")]
    InvalidVin {
        /// Offending VIN.
        vin: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// Attestation header has no signature extension.
    #[error("attestation carries no signature")]
    MissingSignature,
    /// Signature extension is not `0x` hex.
    #[error("signature is not hex: {0}")]
    InvalidSignature(String),
}
