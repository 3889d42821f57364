use thiserror::Error;

/// Errors that can occur while encoding or decoding index keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Subject is not exactly one of an address or a token id.
    #[error("invalid index subject: {0}")]
    InvalidSubject(String),
    /// Filler segment is not two ASCII alphanumerics.
    #[error("invalid {field} filler '{value}'")]
    InvalidFiller {
        /// Which filler segment.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// Data type is empty, non-ASCII or contains the pad character.
    #[error("invalid data type '{0}'")]
    InvalidDataType(String),
    /// Timestamp cannot be rendered in the fixed-width field.
    #[error("timestamp {0} is outside the encodable range")]
    InvalidTimestamp(String),
    /// Encoded key has the wrong length.
    #[error("index key length {len}, expected {expected}")]
    InvalidLength {
        /// Actual length in bytes.
        len: usize,
        /// Required length.
        expected: usize,
    },
    /// Encoded key has a malformed field.
    #[error("malformed index key: {0}")]
    Malformed(String),
}
