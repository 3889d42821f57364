//! Status payload.

use chrono::{DateTime, Utc};
use fleetgate_canonical::{EventHeader, RestrictedText};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SchemaError;
use crate::signal::{Signal, SignalValue};

/// One reading as sent by a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// Signal name.
    pub name: String,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Raw JSON value; numbers and strings are accepted.
    pub value: Value,
}

/// `data` member of a status envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Readings in arrival order.
    #[serde(default)]
    pub signals: Vec<SignalRecord>,
}

impl StatusPayload {
    /// Converts the records into signals carrying the envelope's provenance.
    pub fn into_signals(
        self,
        token_id: u64,
        header: &EventHeader,
    ) -> Result<Vec<Signal>, SchemaError> {
        self.signals
            .into_iter()
            .map(|record| -> Result<Signal, SchemaError> {
                let name = RestrictedText::parse(record.name)?;
                let value = match record.value {
                    Value::Number(n) => match n.as_f64() {
                        Some(v) => SignalValue::Number(v),
                        None => {
                            return Err(SchemaError::UnsupportedValue {
                                name: name.into(),
                                value: n.to_string(),
                            })
                        }
                    },
                    Value::String(s) => SignalValue::String(s),
                    other => {
                        return Err(SchemaError::UnsupportedValue {
                            name: name.into(),
                            value: other.to_string(),
                        })
                    }
                };
                Ok(Signal {
                    token_id,
                    timestamp: record.timestamp,
                    name: name.into(),
                    value,
                    source: header.source.clone(),
                    producer: header.producer.clone(),
                    cloud_event_id: header.id.clone(),
                })
            })
            .collect()
    }
}
