//! Ingestion core for fleetgate.
//!
//! This crate provides:
//! - A registry of vendor decoders keyed by transport-verified source identity
//! - Two-stage attestation signature verification (account recovery, then ERC-1271)
//! - Coalescing of latitude, longitude and HDOP readings into location signals
//! - The per-message pipeline tying decoding, canonicalization and indexing together
//!
//! Core invariants:
//! - Messages are independent; a failure never aborts sibling envelopes or other messages
//! - The core never retries; every envelope ends in a success or a classified failure
//! - Decoding and contract calls are bounded by configured timeouts
//!
#![deny(missing_docs)]

/// Coalescing of location components.
pub mod coalesce;
/// Built-in decoders.
pub mod decoders;
/// Processing error taxonomy.
pub mod errors;
/// Pipeline configuration.
pub mod options;
/// Message pipeline.
pub mod pipeline;
/// Vendor decoder registry.
pub mod registry;
/// Chain read client.
pub mod rpc;
/// Signature verification.
pub mod signature;
/// Failed-message sinks.
pub mod sink;

pub use coalesce::{coalesce, CoalesceError, CoalesceErrors, Coalesced, COALESCE_WINDOW};
pub use decoders::CloudEventDecoder;
pub use errors::ProcessingError;
pub use options::PipelineOptions;
pub use pipeline::{
    ContentClass, EnvelopeMetadata, EnvelopeResult, InboundMessage, Pipeline, ProcessedEnvelope,
};
pub use registry::{ConversionError, DecodeError, Decoder, DecoderRegistry};
pub use rpc::{ChainClient, JsonRpcClient, RpcError};
pub use signature::{
    encode_is_valid_signature, keccak256, personal_message_hash, public_key_address,
    recover_address, SignatureError, SignatureVerifier, ERC1271_MAGIC, SIGNATURE_LEN,
};
pub use sink::{ErrorSink, FailedMessage, FailureRecord, LogErrorSink, VecErrorSink};
