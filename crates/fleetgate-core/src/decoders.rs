use async_trait::async_trait;
use fleetgate_canonical::RawEnvelope;
use serde_json::value::RawValue;

use crate::registry::{ConversionError, DecodeError, Decoder};

/// Decoder for sources that already send canonical envelopes, either one
/// JSON object or a JSON array of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudEventDecoder;

#[async_trait]
impl Decoder for CloudEventDecoder {
    async fn decode(&self, raw: &[u8]) -> Result<Vec<RawEnvelope>, DecodeError> {
        let first = raw.iter().find(|b| !b.is_ascii_whitespace());
        if first != Some(&b'[') {
            return RawEnvelope::from_json_slice(raw)
                .map(|envelope| vec![envelope])
                .map_err(|e| DecodeError::Format(e.to_string()));
        }

        let members: Vec<&RawValue> =
            serde_json::from_slice(raw).map_err(|e| DecodeError::Format(e.to_string()))?;

        let mut envelopes = Vec::with_capacity(members.len());
        let mut errors = Vec::new();
        for (i, member) in members.iter().enumerate() {
            match RawEnvelope::from_json_slice(member.get().as_bytes()) {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => errors.push(format!("element {}: {}", i, e)),
            }
        }

        if errors.is_empty() {
            Ok(envelopes)
        } else {
            Err(DecodeError::Conversion(ConversionError { envelopes, errors }))
        }
    }
}
