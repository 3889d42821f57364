//! Fixed-width storage index keys for fleetgate envelopes.
//!
//! A key is 83 ASCII characters that sort chronologically:
//!
//! | field            | width | content                                  |
//! |------------------|-------|------------------------------------------|
//! | timestamp        | 17    | `YYYYMMDDHHMMSSmmm`, UTC                 |
//! | primary filler   | 2     | `MM`, or `PP` for partial envelopes      |
//! | data type        | 20    | right-padded with `!`                    |
//! | subject          | 42    | `0x` address, `T` token id, or `_` run   |
//! | secondary filler | 2     | `00`                                     |
//!
#![deny(missing_docs)]

/// Index error types.
pub mod errors;
/// Key layout, encoder and decoder.
pub mod key;

pub use errors::IndexError;
pub use key::{
    decode, encode, encode_partial, DecodedIndex, IndexKey, IndexSubject, DATA_TYPE_LEN,
    INDEX_LEN, PRIMARY_FILLER_FULL, PRIMARY_FILLER_PARTIAL, SECONDARY_FILLER, SUBJECT_LEN,
    TIMESTAMP_LEN,
};
