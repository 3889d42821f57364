//! Signal model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latitude component of a location fix.
pub const LATITUDE_SIGNAL: &str = "currentLocationLatitude";
/// Longitude component of a location fix.
pub const LONGITUDE_SIGNAL: &str = "currentLocationLongitude";
/// Horizontal dilution of precision of a location fix.
pub const HDOP_SIGNAL: &str = "currentLocationHdop";
/// Combined location produced by coalescing the three components.
pub const COORDINATES_SIGNAL: &str = "currentLocationCoordinates";

/// Combined location reading. Any subset of fields may be present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationValue {
    /// Degrees north.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Degrees east.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Horizontal dilution of precision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdop: Option<f64>,
}

impl LocationValue {
    /// Location holding a coordinate pair.
    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            hdop: None,
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none() && self.longitude.is_none() && self.hdop.is_none()
    }
}

/// Value of a signal. Exactly one representation per signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Numeric reading.
    Number(f64),
    /// Textual reading.
    String(String),
    /// Combined location.
    Location(LocationValue),
}

impl SignalValue {
    /// Returns the numeric reading, if this is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SignalValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the location, if this is one.
    pub fn as_location(&self) -> Option<&LocationValue> {
        match self {
            SignalValue::Location(loc) => Some(loc),
            _ => None,
        }
    }
}

/// A single named, timestamped reading for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Vehicle token id.
    pub token_id: u64,
    /// When the reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Signal name, e.g. [`LATITUDE_SIGNAL`].
    pub name: String,
    /// Reading.
    pub value: SignalValue,
    /// Trusted source of the envelope the signal came from.
    pub source: String,
    /// Producer of the envelope the signal came from.
    pub producer: String,
    /// Id of the envelope the signal came from.
    pub cloud_event_id: String,
}

impl Signal {
    /// Copy of this signal's provenance with a new name and value.
    pub fn derive(&self, name: impl Into<String>, value: SignalValue) -> Signal {
        Signal {
            token_id: self.token_id,
            timestamp: self.timestamp,
            name: name.into(),
            value,
            source: self.source.clone(),
            producer: self.producer.clone(),
            cloud_event_id: self.cloud_event_id.clone(),
        }
    }
}
