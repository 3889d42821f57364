use crate::validation::ValidationError;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

macro_rules! pattern {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("invalid regex"))
        }
    };
}

pattern!(address_re, r"^0[xX][0-9a-fA-F]{40}$");
pattern!(erc721_re, r"^did:erc721:([0-9]+):(0[xX][0-9a-fA-F]{40}):([0-9]+)$");
pattern!(ethr_re, r"^did:ethr:([0-9]+):(0[xX][0-9a-fA-F]{40})$");
pattern!(legacy_nft_re, r"^did:nft:([0-9]+):(0[xX][0-9a-fA-F]{40})_([0-9]+)$");

/// 20-byte account or contract address, displayed as lowercase `0x` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// Address width in bytes.
    pub const LEN: usize = 20;

    /// Wraps raw address bytes.
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Builds an address from the trailing 20 bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        let raw: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ValidationError::PatternMismatch {
                field: "address",
                value: hex::encode(bytes),
            })?;
        Ok(Self(raw))
    }

    /// Parses a `0x`-prefixed, 40 hex digit address (any case).
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if !address_re().is_match(value) {
            return Err(ValidationError::PatternMismatch {
                field: "address",
                value: value.to_string(),
            });
        }
        let mut raw = [0u8; 20];
        hex::decode_to_slice(&value[2..], &mut raw).map_err(|_| {
            ValidationError::PatternMismatch {
                field: "address",
                value: value.to_string(),
            }
        })?;
        Ok(Self(raw))
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

fn parse_number(caps: &Captures<'_>, idx: usize, field: &'static str) -> Result<u64, ValidationError> {
    let raw = &caps[idx];
    raw.parse().map_err(|_| ValidationError::PatternMismatch {
        field,
        value: raw.to_string(),
    })
}

/// Current identifier for on-chain registered entities:
/// `did:erc721:<chain_id>:<contract>:<token_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Erc721Did {
    /// Chain the registry contract lives on.
    pub chain_id: u64,
    /// Registry contract address.
    pub contract: Address,
    /// Token id within the registry.
    pub token_id: u64,
}

impl Erc721Did {
    /// Parses the current NFT identifier format.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let caps = erc721_re()
            .captures(value)
            .ok_or_else(|| ValidationError::PatternMismatch {
                field: "erc721_did",
                value: value.to_string(),
            })?;
        Ok(Self {
            chain_id: parse_number(&caps, 1, "chain_id")?,
            contract: Address::parse(&caps[2])?,
            token_id: parse_number(&caps, 3, "token_id")?,
        })
    }
}

impl fmt::Display for Erc721Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "did:erc721:{}:{}:{}",
            self.chain_id, self.contract, self.token_id
        )
    }
}

/// Current identifier for accounts: `did:ethr:<chain_id>:<address>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthrDid {
    /// Chain the account is bound to.
    pub chain_id: u64,
    /// Account address.
    pub address: Address,
}

impl EthrDid {
    /// Parses the current account identifier format.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let caps = ethr_re()
            .captures(value)
            .ok_or_else(|| ValidationError::PatternMismatch {
                field: "ethr_did",
                value: value.to_string(),
            })?;
        Ok(Self {
            chain_id: parse_number(&caps, 1, "chain_id")?,
            address: Address::parse(&caps[2])?,
        })
    }
}

impl fmt::Display for EthrDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:ethr:{}:{}", self.chain_id, self.address)
    }
}

/// Deprecated NFT identifier: `did:nft:<chain_id>:<contract>_<token_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegacyNftDid {
    /// Chain the registry contract lives on.
    pub chain_id: u64,
    /// Registry contract address.
    pub contract: Address,
    /// Token id within the registry.
    pub token_id: u64,
}

impl LegacyNftDid {
    /// Parses the deprecated NFT identifier format.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let caps = legacy_nft_re()
            .captures(value)
            .ok_or_else(|| ValidationError::PatternMismatch {
                field: "legacy_nft_did",
                value: value.to_string(),
            })?;
        Ok(Self {
            chain_id: parse_number(&caps, 1, "chain_id")?,
            contract: Address::parse(&caps[2])?,
            token_id: parse_number(&caps, 3, "token_id")?,
        })
    }

    /// Converts to the equivalent current identifier.
    pub fn into_current(self) -> Erc721Did {
        Erc721Did {
            chain_id: self.chain_id,
            contract: self.contract,
            token_id: self.token_id,
        }
    }
}

/// Any identifier in a current format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Did {
    /// NFT-registered entity (vehicle, device).
    Erc721(Erc721Did),
    /// Externally owned or contract account.
    Ethr(EthrDid),
}

impl Did {
    /// Parses an identifier in one of the current formats.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if let Ok(did) = Erc721Did::parse(value) {
            return Ok(Did::Erc721(did));
        }
        if let Ok(did) = EthrDid::parse(value) {
            return Ok(Did::Ethr(did));
        }
        Err(ValidationError::PatternMismatch {
            field: "did",
            value: value.to_string(),
        })
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Did::Erc721(did) => did.fmt(f),
            Did::Ethr(did) => did.fmt(f),
        }
    }
}
