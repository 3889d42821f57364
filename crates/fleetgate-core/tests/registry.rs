use async_trait::async_trait;
use fleetgate_canonical::RawEnvelope;
use fleetgate_core::{CloudEventDecoder, DecodeError, Decoder, DecoderRegistry};
use std::sync::Arc;

struct FixedDecoder(usize);

#[async_trait]
impl Decoder for FixedDecoder {
    async fn decode(&self, _raw: &[u8]) -> Result<Vec<RawEnvelope>, DecodeError> {
        Ok(vec![RawEnvelope::new(Default::default(), Vec::new()); self.0])
    }
}

#[tokio::test]
async fn lookup_by_identity() {
    let mut registry = DecoderRegistry::new();
    assert!(registry.is_empty());
    registry.register("vendor-b", Arc::new(FixedDecoder(1)));
    registry.register("vendor-a", Arc::new(FixedDecoder(2)));

    assert_eq!(registry.identities(), vec!["vendor-a", "vendor-b"]);
    assert!(registry.lookup("vendor-c").is_none());

    let decoder = registry.lookup("vendor-a").unwrap();
    assert_eq!(decoder.decode(b"").await.unwrap().len(), 2);
}

#[tokio::test]
async fn registration_replaces_previous_entry() {
    let mut registry = DecoderRegistry::new();
    registry.register("vendor-a", Arc::new(FixedDecoder(1)));
    registry.register("vendor-a", Arc::new(FixedDecoder(3)));

    assert_eq!(registry.len(), 1);
    let decoder = registry.lookup("vendor-a").unwrap();
    assert_eq!(decoder.decode(b"").await.unwrap().len(), 3);
}

#[tokio::test]
async fn cloud_event_decoder_single_and_array() {
    let single = br#" {"id":"e1","type":"fleetgate.status","data":{"signals":[]}}"#;
    let envelopes = CloudEventDecoder.decode(single).await.unwrap();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].data, br#"{"signals":[]}"#.to_vec());

    let array = br#"[{"id":"e1"},{"id":"e2"}]"#;
    let envelopes = CloudEventDecoder.decode(array).await.unwrap();
    let ids: Vec<&str> = envelopes.iter().map(|e| e.header.id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e2"]);
}

#[tokio::test]
async fn cloud_event_decoder_reports_partial_conversion() {
    let array = br#"[{"id":"e1"},{"id":["bad"]},"nope"]"#;
    match CloudEventDecoder.decode(array).await {
        Err(DecodeError::Conversion(err)) => {
            assert_eq!(err.envelopes.len(), 1);
            assert_eq!(err.errors.len(), 2);
            assert!(err.to_string().contains("element 1"));
        }
        other => panic!("expected conversion error, got {other:?}"),
    }

    assert!(matches!(
        CloudEventDecoder.decode(b"{").await,
        Err(DecodeError::Format(_))
    ));
}
