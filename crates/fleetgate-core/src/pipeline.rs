//! Per-message orchestration.
//!
//! Connection messages are decoded by the vendor decoder registered for their
//! source identity, then every resulting envelope is canonicalized, typed,
//! indexed and, for status payloads, turned into coalesced signals.
//! Attestation messages carry a single signed envelope whose signature is
//! verified against the source identity.

use fleetgate_canonical::{
    Address, Canonicalizer, ContentValidity, Did, RawEnvelope, TYPE_ATTESTATION,
    TYPE_FINGERPRINT, TYPE_STATUS,
};
use fleetgate_index::{encode, encode_partial, IndexKey};
use fleetgate_schemas::{
    AttestationSignature, FingerprintPayload, FormatVinValidator, SchemaError, Signal,
    StatusPayload, VinValidator,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::coalesce::coalesce;
use crate::errors::ProcessingError;
use crate::options::PipelineOptions;
use crate::registry::{DecodeError, DecoderRegistry};
use crate::signature::{personal_message_hash, SignatureVerifier};
use crate::sink::{ErrorSink, FailedMessage};

/// Processing path selected by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    /// Unauthenticated telemetry upload from a vendor connection.
    Connection,
    /// Self-signed assertion.
    Attestation,
}

impl ContentClass {
    /// Processor name reported with failures.
    pub fn processor(&self) -> &'static str {
        match self {
            ContentClass::Connection => "connection",
            ContentClass::Attestation => "attestation",
        }
    }
}

/// One message as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Identity already authenticated by the transport.
    pub source_identity: String,
    /// Processing path.
    pub class: ContentClass,
}

impl InboundMessage {
    /// Connection message.
    pub fn connection(source_identity: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            source_identity: source_identity.into(),
            class: ContentClass::Connection,
        }
    }

    /// Attestation message.
    pub fn attestation(source_identity: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            source_identity: source_identity.into(),
            class: ContentClass::Attestation,
        }
    }
}

/// Metadata attached to a processed envelope for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeMetadata {
    /// Canonical event type.
    pub event_type: String,
    /// Canonical producer.
    pub producer: String,
    /// Canonical subject.
    pub subject: String,
    /// Envelope id.
    pub id: String,
    /// Full or partial storage index key.
    pub index_key: String,
    /// Content-validity marker.
    pub validity: ContentValidity,
    /// Header values for the storage object key; only on the first envelope
    /// produced from a message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key_values: Option<Vec<String>>,
}

/// An envelope that made it through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedEnvelope {
    /// Canonical envelope with the original data bytes.
    pub envelope: RawEnvelope,
    /// Downstream metadata.
    pub metadata: EnvelopeMetadata,
    /// Coalesced signals for status envelopes.
    pub signals: Vec<Signal>,
    /// Non-fatal problems: partial decode errors, coalescing diagnostics.
    pub diagnostics: Vec<String>,
}

/// Result for one derived envelope.
pub type EnvelopeResult = Result<ProcessedEnvelope, FailedMessage>;

/// Stateless message processor shared across concurrent messages.
pub struct Pipeline {
    registry: DecoderRegistry,
    canonicalizer: Canonicalizer,
    verifier: SignatureVerifier,
    vin_validator: Arc<dyn VinValidator>,
    options: PipelineOptions,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .field("verifier", &self.verifier)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with the format-only VIN validator.
    pub fn new(
        registry: DecoderRegistry,
        canonicalizer: Canonicalizer,
        verifier: SignatureVerifier,
        options: PipelineOptions,
    ) -> Self {
        Self {
            registry,
            canonicalizer,
            verifier,
            vin_validator: Arc::new(FormatVinValidator),
            options,
        }
    }

    /// Replaces the VIN validator.
    pub fn with_vin_validator(mut self, validator: Arc<dyn VinValidator>) -> Self {
        self.vin_validator = validator;
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Processes one message into one result per derived envelope.
    ///
    /// A message that fails before any envelope exists yields a single
    /// failure. The object-key values are attached to the first successful
    /// envelope only.
    pub async fn process(&self, msg: InboundMessage) -> Vec<EnvelopeResult> {
        let processor = msg.class.processor();
        let results = match msg.class {
            ContentClass::Connection => self.process_connection(&msg).await,
            ContentClass::Attestation => vec![self.process_attestation(&msg).await],
        };

        let mut attached = false;
        results
            .into_iter()
            .map(|result| match result {
                Ok((mut processed, object_key_values)) => {
                    if !attached {
                        processed.metadata.object_key_values = Some(object_key_values);
                        attached = true;
                    }
                    Ok(processed)
                }
                Err(error) => {
                    debug!(processor, source = %msg.source_identity, error = %error, "envelope failed");
                    Err(FailedMessage {
                        payload: msg.payload.clone(),
                        processor,
                        error,
                    })
                }
            })
            .collect()
    }

    /// Processes independent messages concurrently, one result list per message
    /// in input order.
    pub async fn process_batch(&self, msgs: Vec<InboundMessage>) -> Vec<Vec<EnvelopeResult>> {
        join_all(msgs.into_iter().map(|msg| self.process(msg))).await
    }

    /// Processes one message, routing failures to `sink`.
    pub async fn process_into(
        &self,
        msg: InboundMessage,
        sink: &dyn ErrorSink,
    ) -> Vec<ProcessedEnvelope> {
        let mut processed = Vec::new();
        for result in self.process(msg).await {
            match result {
                Ok(envelope) => processed.push(envelope),
                Err(failed) => sink.publish(failed),
            }
        }
        processed
    }

    async fn process_connection(
        &self,
        msg: &InboundMessage,
    ) -> Vec<Result<(ProcessedEnvelope, Vec<String>), ProcessingError>> {
        let (envelopes, conversion) = match self.decode(msg).await {
            Ok(decoded) => decoded,
            Err(err) => return vec![Err(err)],
        };
        if envelopes.is_empty() {
            return vec![Err(ProcessingError::MissingOutput)];
        }

        envelopes
            .into_iter()
            .map(|envelope| {
                self.connection_envelope(envelope, &msg.source_identity, conversion.as_deref())
            })
            .collect()
    }

    async fn decode(
        &self,
        msg: &InboundMessage,
    ) -> Result<(Vec<RawEnvelope>, Option<String>), ProcessingError> {
        let decoder = self
            .registry
            .lookup(&msg.source_identity)
            .ok_or_else(|| ProcessingError::UnknownVendor(msg.source_identity.clone()))?;

        let limit = self.options.decode_timeout();
        let decoded = tokio::time::timeout(limit, decoder.decode(&msg.payload))
            .await
            .map_err(|_| ProcessingError::Timeout {
                stage: "decode",
                after: limit,
            })?;

        match decoded {
            Ok(envelopes) => Ok((envelopes, None)),
            Err(DecodeError::Conversion(err)) if !err.envelopes.is_empty() => {
                debug!(source = %msg.source_identity, error = %err, "partial conversion");
                let text = err.to_string();
                Ok((err.envelopes, Some(text)))
            }
            Err(DecodeError::Conversion(err)) => Err(ProcessingError::Conversion(err.to_string())),
            Err(DecodeError::Format(text)) | Err(DecodeError::Other(text)) => {
                Err(ProcessingError::Format(text))
            }
        }
    }

    fn connection_envelope(
        &self,
        mut envelope: RawEnvelope,
        source_identity: &str,
        conversion: Option<&str>,
    ) -> Result<(ProcessedEnvelope, Vec<String>), ProcessingError> {
        let fallback_id = Uuid::new_v4().to_string();
        let report =
            self.canonicalizer
                .canonicalize(&mut envelope.header, source_identity, &fallback_id)?;
        let validity = report
            .validity
            .degrade(self.canonicalizer.check_connection_type(&envelope.header)?);

        let mut diagnostics: Vec<String> = conversion.map(str::to_string).into_iter().collect();
        let mut signals = Vec::new();
        if validity == ContentValidity::Valid {
            match envelope.header.event_type.as_str() {
                TYPE_STATUS => signals = self.status_signals(&envelope, &mut diagnostics)?,
                TYPE_FINGERPRINT => {
                    let payload: FingerprintPayload =
                        envelope.parse_data().map_err(SchemaError::from)?;
                    self.vin_validator.validate(&payload.vin)?;
                }
                _ => {}
            }
        }

        self.finish(envelope, validity, signals, diagnostics)
    }

    fn status_signals(
        &self,
        envelope: &RawEnvelope,
        diagnostics: &mut Vec<String>,
    ) -> Result<Vec<Signal>, ProcessingError> {
        let token_id = match Did::parse(&envelope.header.subject) {
            Ok(Did::Erc721(did)) => did.token_id,
            _ => {
                diagnostics.push(format!(
                    "subject '{}' has no token id; signals skipped",
                    envelope.header.subject
                ));
                return Ok(Vec::new());
            }
        };
        let payload: StatusPayload = envelope.parse_data().map_err(SchemaError::from)?;
        let coalesced = coalesce(payload.into_signals(token_id, &envelope.header)?);
        diagnostics.extend(coalesced.diagnostics.iter().map(ToString::to_string));
        Ok(coalesced.signals)
    }

    async fn process_attestation(
        &self,
        msg: &InboundMessage,
    ) -> Result<(ProcessedEnvelope, Vec<String>), ProcessingError> {
        let mut envelope = RawEnvelope::from_json_slice(&msg.payload)
            .map_err(|e| ProcessingError::Format(e.to_string()))?;
        let signer = Address::parse(&msg.source_identity).map_err(|e| {
            ProcessingError::Signature(format!("source identity is not an address: {}", e))
        })?;

        envelope.header.event_type = TYPE_ATTESTATION.to_string();
        let fallback_id = Uuid::new_v4().to_string();
        let report = self.canonicalizer.canonicalize(
            &mut envelope.header,
            &signer.to_string(),
            &fallback_id,
        )?;

        let signature = AttestationSignature::from_header(&envelope.header)
            .map_err(|e| ProcessingError::Signature(e.to_string()))?;
        let hash = personal_message_hash(&envelope.data);
        self.verifier
            .verify(&hash, signature.as_bytes(), &signer)
            .await?;

        self.finish(envelope, report.validity, Vec::new(), Vec::new())
    }

    fn finish(
        &self,
        envelope: RawEnvelope,
        validity: ContentValidity,
        signals: Vec<Signal>,
        diagnostics: Vec<String>,
    ) -> Result<(ProcessedEnvelope, Vec<String>), ProcessingError> {
        let header = &envelope.header;
        let index_key = if validity == ContentValidity::Valid {
            encode(&IndexKey::from_header(header)?)?
        } else {
            encode_partial(&IndexKey::partial_from_header(header))?
        };

        let metadata = EnvelopeMetadata {
            event_type: header.event_type.clone(),
            producer: header.producer.clone(),
            subject: header.subject.clone(),
            id: header.id.clone(),
            index_key,
            validity,
            object_key_values: None,
        };
        let object_key_values = header.object_key_values();

        Ok((
            ProcessedEnvelope {
                envelope,
                metadata,
                signals,
                diagnostics,
            },
            object_key_values,
        ))
    }
}
