use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use fleetgate_canonical::{Address, Did, EventHeader};

use crate::errors::IndexError;

/// Timestamp field format: `YYYYMMDDHHMMSSmmm`, UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Timestamp field width.
pub const TIMESTAMP_LEN: usize = 17;

/// Width of each filler segment.
pub const FILLER_LEN: usize = 2;

/// Data type field width.
pub const DATA_TYPE_LEN: usize = 20;

/// Subject field width.
pub const SUBJECT_LEN: usize = 42;

/// Total key width.
pub const INDEX_LEN: usize = TIMESTAMP_LEN + FILLER_LEN + DATA_TYPE_LEN + SUBJECT_LEN + FILLER_LEN;

/// Primary filler for fully validated envelopes.
pub const PRIMARY_FILLER_FULL: &str = "MM";

/// Primary filler for partially validated envelopes.
pub const PRIMARY_FILLER_PARTIAL: &str = "PP";

/// Default secondary filler.
pub const SECONDARY_FILLER: &str = "00";

/// Right-pad character for the data type field.
pub const DATA_TYPE_PAD: char = '!';

/// Subject placeholder character used by partial keys.
pub const SUBJECT_PLACEHOLDER: char = '_';

/// Prefix marking a token id subject.
pub const TOKEN_ID_PREFIX: char = 'T';

const TIMESTAMP_END: usize = TIMESTAMP_LEN;
const PRIMARY_END: usize = TIMESTAMP_END + FILLER_LEN;
const DATA_TYPE_END: usize = PRIMARY_END + DATA_TYPE_LEN;
const SUBJECT_END: usize = DATA_TYPE_END + SUBJECT_LEN;

/// Subject of an index key: an address or a token id, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexSubject {
    /// Account or contract address.
    pub address: Option<Address>,
    /// On-chain token id.
    pub token_id: Option<u64>,
}

impl IndexSubject {
    /// Subject identified by address.
    pub fn address(address: Address) -> Self {
        Self {
            address: Some(address),
            token_id: None,
        }
    }

    /// Subject identified by token id.
    pub fn token_id(token_id: u64) -> Self {
        Self {
            address: None,
            token_id: Some(token_id),
        }
    }

    fn encode(&self) -> Result<String, IndexError> {
        match (self.address, self.token_id) {
            (Some(address), None) => Ok(address.to_string()),
            (None, Some(token_id)) => Ok(format!(
                "{}{:0width$}",
                TOKEN_ID_PREFIX,
                token_id,
                width = SUBJECT_LEN - 1
            )),
            (Some(_), Some(_)) => Err(IndexError::InvalidSubject(
                "both address and token id are set".to_string(),
            )),
            (None, None) => Err(IndexError::InvalidSubject(
                "neither address nor token id is set".to_string(),
            )),
        }
    }

    fn decode(field: &str) -> Result<Option<Self>, IndexError> {
        if field.chars().all(|c| c == SUBJECT_PLACEHOLDER) {
            return Ok(None);
        }
        if let Some(digits) = field.strip_prefix(TOKEN_ID_PREFIX) {
            let token_id = digits
                .parse::<u64>()
                .map_err(|_| IndexError::Malformed(format!("token id subject '{}'", field)))?;
            return Ok(Some(Self::token_id(token_id)));
        }
        let address = Address::parse(field)
            .map_err(|_| IndexError::Malformed(format!("address subject '{}'", field)))?;
        Ok(Some(Self::address(address)))
    }
}

/// Fields embedded in a storage index key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// First filler segment.
    pub primary_filler: String,
    /// Second filler segment.
    pub secondary_filler: String,
    /// Data type tag, at most [`DATA_TYPE_LEN`] characters are kept.
    pub data_type: String,
    /// Address or token id.
    pub subject: IndexSubject,
}

impl IndexKey {
    /// Creates a key with the default fillers.
    pub fn new(timestamp: DateTime<Utc>, data_type: impl Into<String>, subject: IndexSubject) -> Self {
        Self {
            timestamp,
            primary_filler: PRIMARY_FILLER_FULL.to_string(),
            secondary_filler: SECONDARY_FILLER.to_string(),
            data_type: data_type.into(),
            subject,
        }
    }

    /// Builds a key from a canonicalized header.
    ///
    /// The data type is the header's data version when present, otherwise its
    /// type. `did:erc721` subjects become token ids, `did:ethr` subjects
    /// addresses.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidSubject`] if the subject is not in a current DID
    /// format. After canonicalization this only happens for partial envelopes,
    /// which should use [`IndexKey::partial_from_header`].
    pub fn from_header(header: &EventHeader) -> Result<Self, IndexError> {
        let subject = match Did::parse(&header.subject) {
            Ok(Did::Erc721(did)) => IndexSubject::token_id(did.token_id),
            Ok(Did::Ethr(did)) => IndexSubject::address(did.address),
            Err(_) => {
                return Err(IndexError::InvalidSubject(format!(
                    "subject '{}' is not a current identifier",
                    header.subject
                )))
            }
        };
        Ok(Self::new(header.time, header_data_type(header), subject))
    }

    /// Builds a subject-less key for envelopes kept only for forensics.
    pub fn partial_from_header(header: &EventHeader) -> Self {
        let mut key = Self::new(header.time, header_data_type(header), IndexSubject::default());
        key.primary_filler = PRIMARY_FILLER_PARTIAL.to_string();
        key
    }
}

fn header_data_type(header: &EventHeader) -> String {
    header
        .data_version
        .clone()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| header.event_type.clone())
}

/// Result of decoding an index key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedIndex {
    /// Decoded fields; the subject is empty for partial keys.
    pub key: IndexKey,
    /// Whether the key carried the placeholder subject.
    pub partial: bool,
}

fn check_filler(field: &'static str, value: &str) -> Result<(), IndexError> {
    if value.len() == FILLER_LEN && value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Ok(());
    }
    Err(IndexError::InvalidFiller {
        field,
        value: value.to_string(),
    })
}

fn encode_timestamp(timestamp: &DateTime<Utc>) -> Result<String, IndexError> {
    if !(0..=9999).contains(&timestamp.year()) {
        return Err(IndexError::InvalidTimestamp(timestamp.to_rfc3339()));
    }
    Ok(timestamp.format(TIMESTAMP_FORMAT).to_string())
}

fn encode_data_type(data_type: &str) -> Result<String, IndexError> {
    if data_type.is_empty() || !data_type.is_ascii() || data_type.contains(DATA_TYPE_PAD) {
        return Err(IndexError::InvalidDataType(data_type.to_string()));
    }
    let mut field: String = data_type.chars().take(DATA_TYPE_LEN).collect();
    while field.len() < DATA_TYPE_LEN {
        field.push(DATA_TYPE_PAD);
    }
    Ok(field)
}

fn assemble(key: &IndexKey, primary: &str, subject: &str) -> Result<String, IndexError> {
    check_filler("primary", primary)?;
    check_filler("secondary", &key.secondary_filler)?;

    let mut out = String::with_capacity(INDEX_LEN);
    out.push_str(&encode_timestamp(&key.timestamp)?);
    out.push_str(primary);
    out.push_str(&encode_data_type(&key.data_type)?);
    out.push_str(subject);
    out.push_str(&key.secondary_filler);
    debug_assert_eq!(out.len(), INDEX_LEN);
    Ok(out)
}

/// Encodes a full index key.
///
/// # Errors
///
/// [`IndexError::InvalidSubject`] unless exactly one of address and token id
/// is set; filler, data type and timestamp range errors for malformed input.
pub fn encode(key: &IndexKey) -> Result<String, IndexError> {
    let subject = key.subject.encode()?;
    assemble(key, &key.primary_filler, &subject)
}

/// Encodes a partial index key: placeholder subject, partial primary filler.
pub fn encode_partial(key: &IndexKey) -> Result<String, IndexError> {
    let placeholder: String = std::iter::repeat(SUBJECT_PLACEHOLDER)
        .take(SUBJECT_LEN)
        .collect();
    assemble(key, PRIMARY_FILLER_PARTIAL, &placeholder)
}

/// Decodes an index key back into its fields.
pub fn decode(index: &str) -> Result<DecodedIndex, IndexError> {
    if index.len() != INDEX_LEN {
        return Err(IndexError::InvalidLength {
            len: index.len(),
            expected: INDEX_LEN,
        });
    }
    if !index.is_ascii() {
        return Err(IndexError::Malformed("non-ASCII characters".to_string()));
    }

    let timestamp_field = &index[..TIMESTAMP_END];
    let timestamp = NaiveDateTime::parse_from_str(timestamp_field, TIMESTAMP_FORMAT)
        .map_err(|e| IndexError::Malformed(format!("timestamp '{}': {}", timestamp_field, e)))?
        .and_utc();

    let primary_filler = index[TIMESTAMP_END..PRIMARY_END].to_string();
    check_filler("primary", &primary_filler)?;

    let data_type = index[PRIMARY_END..DATA_TYPE_END]
        .trim_end_matches(DATA_TYPE_PAD)
        .to_string();
    if data_type.is_empty() {
        return Err(IndexError::Malformed("empty data type".to_string()));
    }

    let subject = IndexSubject::decode(&index[DATA_TYPE_END..SUBJECT_END])?;

    let secondary_filler = index[SUBJECT_END..].to_string();
    check_filler("secondary", &secondary_filler)?;

    let partial = subject.is_none();
    Ok(DecodedIndex {
        key: IndexKey {
            timestamp,
            primary_filler,
            secondary_filler,
            data_type,
            subject: subject.unwrap_or_default(),
        },
        partial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn layout_widths_add_up() {
        assert_eq!(INDEX_LEN, 83);
        assert_eq!(SUBJECT_LEN, 2 + 2 * Address::LEN);
    }

    #[test]
    fn token_id_fills_subject_width() {
        let subject = IndexSubject::token_id(u64::MAX).encode().unwrap();
        assert_eq!(subject.len(), SUBJECT_LEN);
        assert!(subject.starts_with('T'));
    }

    #[test]
    fn data_type_is_padded_and_truncated() {
        assert_eq!(encode_data_type("status").unwrap(), "status!!!!!!!!!!!!!!");
        assert_eq!(
            encode_data_type("fleetgate.fingerprint.v2").unwrap(),
            "fleetgate.fingerprin"
        );
        assert!(encode_data_type("").is_err());
        assert!(encode_data_type("bad!").is_err());
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        let ts = Utc.timestamp_millis_opt(1_717_243_200_123).unwrap();
        assert_eq!(encode_timestamp(&ts).unwrap(), "20240601120000123");
    }

    #[test]
    fn filler_must_be_two_alphanumerics() {
        assert!(check_filler("primary", "MM").is_ok());
        assert!(check_filler("primary", "M").is_err());
        assert!(check_filler("primary", "M!").is_err());
    }
}
