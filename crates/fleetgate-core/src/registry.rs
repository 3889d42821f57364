use async_trait::async_trait;
use fleetgate_canonical::RawEnvelope;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Envelopes a decoder managed to produce, plus the errors for the parts it
/// could not convert.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionError {
    /// Envelopes that decoded successfully.
    pub envelopes: Vec<RawEnvelope>,
    /// One message per failed part.
    pub errors: Vec<String>,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} envelope(s) converted, {} failed: {}",
            self.envelopes.len(),
            self.errors.len(),
            self.errors.join("; ")
        )
    }
}

impl std::error::Error for ConversionError {}

/// Errors returned by a [`Decoder`].
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Input bytes could not be parsed at all.
    #[error("malformed payload: {0}")]
    Format(String),
    /// Decoding partially succeeded.
    #[error("partial conversion: {0}")]
    Conversion(ConversionError),
    /// Any other decoder failure.
    #[error("{0}")]
    Other(String),
}

/// Turns one vendor payload into zero or more raw envelopes.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Decodes `raw`. Envelope headers are canonicalized afterwards by the
    /// pipeline, so decoders only need to populate what the vendor sends.
    async fn decode(&self, raw: &[u8]) -> Result<Vec<RawEnvelope>, DecodeError>;
}

/// Decoders keyed by the transport-verified source identity.
///
/// Populated once at startup; lookups never mutate.
#[derive(Default, Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Arc<dyn Decoder>>,
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("identities", &self.identities())
            .finish()
    }
}

impl DecoderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `decoder` for `identity`, replacing any previous entry.
    pub fn register(&mut self, identity: impl Into<String>, decoder: Arc<dyn Decoder>) {
        let identity = identity.into();
        if self.decoders.insert(identity.clone(), decoder).is_some() {
            warn!(identity = %identity, "replaced existing decoder registration");
        } else {
            info!(identity = %identity, "registered decoder");
        }
    }

    /// Decoder registered for `identity`.
    pub fn lookup(&self, identity: &str) -> Option<Arc<dyn Decoder>> {
        self.decoders.get(identity).cloned()
    }

    /// Registered identities, sorted.
    pub fn identities(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}
