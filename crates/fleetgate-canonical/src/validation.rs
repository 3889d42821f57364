use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

/// Characters allowed in every textual header field.
pub const RESTRICTED_CLASS: &str = r"^[A-Za-z0-9\-_/,. :]+$";

/// Validation errors for canonical headers and identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// A header field contains characters outside the restricted class.
    #[error("{field} contains invalid characters: '{value}'")]
    InvalidCharacters {
        /// Header field name (wire name).
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// A required header field is empty.
    #[error("{field} is required")]
    MissingField {
        /// Header field name (wire name).
        field: &'static str,
    },
    /// The event type is not accepted on this processing path.
    #[error("unsupported event type '{0}'")]
    UnsupportedType(String),
}

fn restricted_class() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RESTRICTED_CLASS).expect("invalid regex"))
}

/// Returns true when `value` only contains restricted-class characters.
pub fn is_restricted_text(value: &str) -> bool {
    restricted_class().is_match(value)
}

/// Checks a populated field against the restricted class.
///
/// Empty values pass; required-field checks are separate.
pub fn check_field(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || is_restricted_text(value) {
        return Ok(());
    }
    Err(ValidationError::InvalidCharacters {
        field,
        value: value.to_string(),
    })
}

/// Text value known to satisfy the restricted character class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RestrictedText(String);

impl RestrictedText {
    /// Parses a non-empty restricted-class value.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if !is_restricted_text(&s) {
            return Err(ValidationError::PatternMismatch {
                field: "RestrictedText",
                value: s,
            });
        }
        Ok(Self(s))
    }

    /// Borrows the validated text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RestrictedText {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RestrictedText> for String {
    fn from(value: RestrictedText) -> Self {
        value.0
    }
}

impl AsRef<str> for RestrictedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RestrictedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
