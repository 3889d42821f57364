//! Canonical event header model for fleetgate envelopes.
//!
//! Every envelope that leaves the ingestion core carries an [`EventHeader`]
//! that has been through [`Canonicalizer::canonicalize`]: trusted source,
//! defaults filled, restricted character set enforced and legacy identifiers
//! rewritten to the current `did:` formats.
//!
#![deny(missing_docs)]

/// Header defaulting, validation and identifier migration.
pub mod canonicalizer;
/// Event header and envelope types.
pub mod header;
/// Address and DID identifier formats.
pub mod identifiers;
/// Per-key rate-limited logging.
pub mod ratelimit;
/// Validation errors and the restricted character class.
pub mod validation;
/// Content-validity marker and canonicalization report.
pub mod validity;

pub use canonicalizer::{Canonicalizer, CanonicalizerOptions};
pub use header::{
    Envelope, EventHeader, RawEnvelope, DEFAULT_CONTENT_TYPE, SIGNATURE_EXTENSION, SPEC_VERSION,
    TYPE_ATTESTATION, TYPE_FINGERPRINT, TYPE_STATUS, TYPE_UNKNOWN,
};
pub use identifiers::{Address, Did, Erc721Did, EthrDid, LegacyNftDid};
pub use ratelimit::RateLimitedLog;
pub use validation::{is_restricted_text, RestrictedText, ValidationError};
pub use validity::{CanonicalReport, ContentValidity};
