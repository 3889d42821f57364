//! Payload schemas carried inside fleetgate envelopes.
//!
//! This crate provides the typed signal model produced from status payloads,
//! the fingerprint payload with its VIN check, and the signature carried by
//! attestation envelopes.

#![deny(missing_docs)]

/// Attestation signature extension.
pub mod attestation;
/// Schema error types.
pub mod errors;
/// Fingerprint payload and VIN validation.
pub mod fingerprint;
/// Signal model.
pub mod signal;
/// Status payload.
pub mod status;

pub use attestation::AttestationSignature;
pub use errors::SchemaError;
pub use fingerprint::{FingerprintPayload, FormatVinValidator, VinValidator, VIN_LEN};
pub use signal::{
    LocationValue, Signal, SignalValue, COORDINATES_SIGNAL, HDOP_SIGNAL, LATITUDE_SIGNAL,
    LONGITUDE_SIGNAL,
};
pub use status::{SignalRecord, StatusPayload};
