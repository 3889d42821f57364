//! Fingerprint payload and VIN validation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::errors::SchemaError;

/// VIN length.
pub const VIN_LEN: usize = 17;

/// `data` member of a fingerprint envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintPayload {
    /// Vehicle identification number.
    pub vin: String,
}

/// Checks VINs reported by fingerprint envelopes.
pub trait VinValidator: Send + Sync {
    /// Returns an error when `vin` is not acceptable.
    fn validate(&self, vin: &str) -> Result<(), SchemaError>;
}

/// Format-only check: 17 characters from the VIN alphabet (no I, O or Q).
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatVinValidator;

fn vin_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-HJ-NPR-Z0-9]+$").expect("invalid regex"))
}

impl VinValidator for FormatVinValidator {
    fn validate(&self, vin: &str) -> Result<(), SchemaError> {
        if vin.len() != VIN_LEN {
            return Err(SchemaError::InvalidVin {
                vin: vin.to_string(),
                reason: "must be 17 characters",
            });
        }
        if !vin_re().is_match(vin) {
            return Err(SchemaError::InvalidVin {
                vin: vin.to_string(),
                reason: "contains characters outside the VIN alphabet",
            });
        }
        Ok(())
    }
}
