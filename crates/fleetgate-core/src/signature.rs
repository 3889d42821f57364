//! Attestation signature verification.
//!
//! A signature is authentic when either the signer is an externally owned
//! account whose key recovers from the signature, or the signer is a contract
//! that accepts the signature through ERC-1271 `isValidSignature`.

use fleetgate_canonical::Address;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::rpc::{ChainClient, RpcError};

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// ERC-1271 `isValidSignature(bytes32,bytes)` selector and magic return value.
pub const ERC1271_MAGIC: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Why a signature was not accepted.
#[derive(Error, Debug)]
pub enum SignatureError {
    /// Signature is not 65 bytes.
    #[error("signature must be {SIGNATURE_LEN} bytes, got {len}")]
    InvalidLength {
        /// Actual length.
        len: usize,
    },
    /// Recovery byte is not 27 or 28.
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),
    /// Public key could not be recovered.
    #[error("public key recovery failed: {0}")]
    Recovery(String),
    /// Recovered key belongs to a different account.
    #[error("recovered address {recovered} does not match signer {claimed}")]
    AddressMismatch {
        /// Address derived from the signature.
        recovered: Address,
        /// Address the signature was claimed for.
        claimed: Address,
    },
    /// Contract did not return the ERC-1271 magic value.
    #[error("contract {signer} rejected the signature")]
    ContractRejected {
        /// Contract that was asked.
        signer: Address,
    },
    /// Contract call failed.
    #[error("contract call failed: {0}")]
    Rpc(#[from] RpcError),
    /// Both verification paths failed.
    #[error("{eoa}\n{contract}")]
    Joined {
        /// Account recovery failure.
        eoa: Box<SignatureError>,
        /// Contract verification failure.
        contract: Box<SignatureError>,
    },
}

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash signed by wallets for a personal message: the payload prefixed with
/// `"\x19Ethereum Signed Message:\n"` and its decimal length.
pub fn personal_message_hash(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(payload.len().to_string().as_bytes());
    hasher.update(payload);
    hasher.finalize().into()
}

/// Account address of a public key: the last 20 bytes of the Keccak-256
/// digest of the uncompressed point without its tag byte.
pub fn public_key_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut raw = [0u8; Address::LEN];
    raw.copy_from_slice(&digest[12..]);
    Address::new(raw)
}

/// Recovers the signing account from a 65-byte signature over `hash`.
pub fn recover_address(hash: &[u8; 32], signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength {
            len: signature.len(),
        });
    }
    let raw_v = signature[64];
    let v = raw_v.wrapping_sub(27);
    if v > 1 {
        return Err(SignatureError::InvalidRecoveryId(raw_v));
    }
    let recovery_id =
        RecoveryId::from_byte(v).ok_or(SignatureError::InvalidRecoveryId(raw_v))?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;

    // High-s signatures recover with the opposite y parity once normalized.
    let (sig, recovery_id) = match sig.normalize_s() {
        Some(normalized) => (
            normalized,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        ),
        None => (sig, recovery_id),
    };

    let key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;
    Ok(public_key_address(&key))
}

/// ABI-encodes `isValidSignature(bytes32 hash, bytes signature)`.
pub fn encode_is_valid_signature(hash: &[u8; 32], signature: &[u8]) -> Vec<u8> {
    let padded = signature.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(4 + 32 * 3 + padded);
    out.extend_from_slice(&ERC1271_MAGIC);
    out.extend_from_slice(hash);
    out.extend_from_slice(&abi_word(0x40));
    out.extend_from_slice(&abi_word(signature.len() as u64));
    out.extend_from_slice(signature);
    out.resize(4 + 32 * 3 + padded, 0);
    out
}

fn abi_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Two-stage signature verifier.
#[derive(Clone)]
pub struct SignatureVerifier {
    client: Arc<dyn ChainClient>,
    rpc_timeout: Duration,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("rpc_timeout", &self.rpc_timeout)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    /// Creates a verifier. `rpc_timeout` bounds the contract call.
    pub fn new(client: Arc<dyn ChainClient>, rpc_timeout: Duration) -> Self {
        Self {
            client,
            rpc_timeout,
        }
    }

    /// Checks that `signature` over `hash` was produced by `signer`.
    ///
    /// Account recovery is tried first; on failure the signer is asked as an
    /// ERC-1271 contract. Returns `Ok(true)` when either accepts.
    ///
    /// # Errors
    ///
    /// [`SignatureError::InvalidLength`] without any contract call when the
    /// signature is not 65 bytes, otherwise [`SignatureError::Joined`]
    /// carrying both failures.
    pub async fn verify(
        &self,
        hash: &[u8; 32],
        signature: &[u8],
        signer: &Address,
    ) -> Result<bool, SignatureError> {
        if signature.len() != SIGNATURE_LEN {
            return Err(SignatureError::InvalidLength {
                len: signature.len(),
            });
        }

        let eoa = match recover_address(hash, signature) {
            Ok(recovered) if recovered == *signer => return Ok(true),
            Ok(recovered) => SignatureError::AddressMismatch {
                recovered,
                claimed: *signer,
            },
            Err(err) => err,
        };
        debug!(signer = %signer, error = %eoa, "account recovery failed, trying contract");

        match self.verify_contract(hash, signature, signer).await {
            Ok(()) => Ok(true),
            Err(contract) => Err(SignatureError::Joined {
                eoa: Box::new(eoa),
                contract: Box::new(contract),
            }),
        }
    }

    async fn verify_contract(
        &self,
        hash: &[u8; 32],
        signature: &[u8],
        signer: &Address,
    ) -> Result<(), SignatureError> {
        let calldata = encode_is_valid_signature(hash, signature);
        let ret = tokio::time::timeout(self.rpc_timeout, self.client.call(signer, &calldata))
            .await
            .map_err(|_| RpcError::Timeout(self.rpc_timeout))??;
        if ret.len() >= 4 && ret[..4] == ERC1271_MAGIC {
            return Ok(());
        }
        Err(SignatureError::ContractRejected { signer: *signer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_hash_matches_known_vector() {
        // keccak256("\x19Ethereum Signed Message:\n11hello world")
        assert_eq!(
            hex::encode(personal_message_hash(b"hello world")),
            "d9eba16ed0ecae432b71fe008c98cc872bb4cc214d3220a36f365326cf807d68"
        );
    }

    #[test]
    fn calldata_layout() {
        let hash = [0x11u8; 32];
        let sig = [0x22u8; 65];
        let data = encode_is_valid_signature(&hash, &sig);

        assert_eq!(data.len(), 4 + 32 * 3 + 96);
        assert_eq!(&data[..4], &ERC1271_MAGIC);
        assert_eq!(&data[4..36], &hash);
        assert_eq!(data[67], 0x40);
        assert_eq!(data[99], 65);
        assert_eq!(&data[100..165], &sig[..]);
        assert!(data[165..].iter().all(|b| *b == 0));
    }

    #[test]
    fn recovery_id_out_of_range() {
        let mut sig = [1u8; 65];
        for raw_v in [0u8, 1, 26, 29] {
            sig[64] = raw_v;
            assert!(matches!(
                recover_address(&[0u8; 32], &sig),
                Err(SignatureError::InvalidRecoveryId(v)) if v == raw_v
            ));
        }
    }
}
