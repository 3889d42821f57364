//! Attestation signature.

use fleetgate_canonical::{EventHeader, SIGNATURE_EXTENSION};

use crate::errors::SchemaError;

/// Raw signature bytes carried in an attestation's `signature` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationSignature(Vec<u8>);

impl AttestationSignature {
    /// Decodes the `0x` hex signature from the header extensions.
    pub fn from_header(header: &EventHeader) -> Result<Self, SchemaError> {
        let text = header
            .extension_str(SIGNATURE_EXTENSION)
            .ok_or(SchemaError::MissingSignature)?;
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        let bytes = hex::decode(digits).map_err(|e| SchemaError::InvalidSignature(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the wrapper.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}
