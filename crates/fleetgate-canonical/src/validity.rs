use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-validity marker attached to every processed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentValidity {
    /// Every header field passed validation in its current format.
    #[serde(rename = "valid_cloudevent")]
    Valid,
    /// A soft fallback engaged (e.g. an identifier in neither current nor legacy format).
    #[serde(rename = "partial_cloudevent")]
    Partial,
    /// Decoding succeeded but the semantic type could not be classified.
    #[serde(rename = "unknown_cloudevent")]
    UnknownType,
}

impl ContentValidity {
    /// Stable classification string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentValidity::Valid => "valid_cloudevent",
            ContentValidity::Partial => "partial_cloudevent",
            ContentValidity::UnknownType => "unknown_cloudevent",
        }
    }

    /// Returns the weaker of two markers.
    pub fn degrade(self, other: ContentValidity) -> ContentValidity {
        match (self, other) {
            (ContentValidity::UnknownType, _) | (_, ContentValidity::UnknownType) => {
                ContentValidity::UnknownType
            }
            (ContentValidity::Partial, _) | (_, ContentValidity::Partial) => {
                ContentValidity::Partial
            }
            _ => ContentValidity::Valid,
        }
    }
}

impl fmt::Display for ContentValidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of canonicalizing one header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalReport {
    /// Validity marker after identifier checks.
    pub validity: ContentValidity,
    /// Fields rewritten from the legacy identifier format.
    pub migrated_fields: Vec<&'static str>,
    /// Whether `time` lies beyond the allowed clock skew.
    pub future_time: bool,
}

impl CanonicalReport {
    /// A report for a header that needed no fallback.
    pub fn valid() -> Self {
        Self {
            validity: ContentValidity::Valid,
            migrated_fields: Vec::new(),
            future_time: false,
        }
    }
}
