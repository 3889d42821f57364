//! Event header and envelope types.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::BTreeMap;

/// Spec version stamped on every canonical header.
pub const SPEC_VERSION: &str = "1.0";

/// Default payload content type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Telemetry snapshot uploaded by a connection.
pub const TYPE_STATUS: &str = "fleetgate.status";
/// Vehicle identity payload carrying a VIN.
pub const TYPE_FINGERPRINT: &str = "fleetgate.fingerprint";
/// Self-signed assertion.
pub const TYPE_ATTESTATION: &str = "fleetgate.attestation";
/// Decoded successfully but could not be classified by the decoder.
pub const TYPE_UNKNOWN: &str = "fleetgate.unknown";

/// Extension key holding an attestation signature.
pub const SIGNATURE_EXTENSION: &str = "signature";

/// Identity and type metadata shared by every envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventHeader {
    /// Unique event id.
    #[serde(default)]
    pub id: String,
    /// Trusted identity of the connection that delivered the event.
    #[serde(default)]
    pub source: String,
    /// Identity of the device or service that produced the event.
    #[serde(default)]
    pub producer: String,
    /// Identity the event is about.
    #[serde(default)]
    pub subject: String,
    /// Creation time; the Unix epoch means "unset".
    #[serde(default)]
    pub time: DateTime<Utc>,
    /// Semantic type tag.
    #[serde(rename = "type", default)]
    pub event_type: String,
    /// Envelope spec version.
    #[serde(rename = "specversion", default)]
    pub spec_version: String,
    /// Payload content type.
    #[serde(rename = "datacontenttype", default)]
    pub data_content_type: String,
    /// Optional payload schema reference.
    #[serde(
        rename = "dataschema",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data_schema: Option<String>,
    /// Optional payload version tag.
    #[serde(
        rename = "dataversion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data_version: Option<String>,
    /// Open extension map; exempt from character-class validation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

impl EventHeader {
    /// Returns true when `time` still holds the zero value.
    pub fn has_zero_time(&self) -> bool {
        self.time.timestamp() == 0 && self.time.timestamp_subsec_nanos() == 0
    }

    /// Header values the object-key builder needs, in order:
    /// subject, time, type, source, producer, id, data version.
    pub fn object_key_values(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.time.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.event_type.clone(),
            self.source.clone(),
            self.producer.clone(),
            self.id.clone(),
            self.data_version.clone().unwrap_or_default(),
        ]
    }

    /// Looks up a string-valued extension.
    pub fn extension_str(&self, key: &str) -> Option<&str> {
        self.extras.get(key).and_then(Value::as_str)
    }
}

/// A canonical header paired with a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    /// Header fields, flattened next to `data` on the wire.
    #[serde(flatten)]
    pub header: EventHeader,
    /// Payload.
    pub data: P,
}

/// Envelope whose payload is kept as the exact bytes of the `data` member.
pub type RawEnvelope = Envelope<Vec<u8>>;

impl<P> Envelope<P> {
    /// Creates an envelope.
    pub fn new(header: EventHeader, data: P) -> Self {
        Self { header, data }
    }

    /// Converts the payload, keeping the header.
    pub fn map_data<Q>(self, f: impl FnOnce(P) -> Q) -> Envelope<Q> {
        Envelope {
            header: self.header,
            data: f(self.data),
        }
    }
}

#[derive(Deserialize)]
struct DataMember<'a> {
    #[serde(borrow, default)]
    data: Option<&'a RawValue>,
}

#[derive(Serialize)]
struct WireEnvelope<'a> {
    #[serde(flatten)]
    header: &'a EventHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a RawValue>,
}

impl RawEnvelope {
    /// Parses one JSON envelope, preserving the `data` bytes exactly as sent.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let header: EventHeader = serde_json::from_slice(bytes)?;
        let member: DataMember<'_> = serde_json::from_slice(bytes)?;
        let data = member
            .data
            .map(|raw| raw.get().as_bytes().to_vec())
            .unwrap_or_default();
        Ok(Self { header, data })
    }

    /// Parses a JSON value holding one envelope.
    pub fn from_json_value(value: &Value) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        Self::from_json_slice(&bytes)
    }

    /// Serializes back to the wire shape. `data` must hold JSON.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        let raw = if self.data.is_empty() {
            None
        } else {
            let text = std::str::from_utf8(&self.data).map_err(<serde_json::Error as serde::ser::Error>::custom)?;
            Some(RawValue::from_string(text.to_string())?)
        };
        serde_json::to_vec(&WireEnvelope {
            header: &self.header,
            data: raw.as_deref(),
        })
    }

    /// Decodes the payload into a typed value.
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }
}
