use async_trait::async_trait;
use fleetgate_canonical::Address;
use fleetgate_core::{
    personal_message_hash, public_key_address, ChainClient, RpcError, SignatureError,
    SignatureVerifier, ERC1271_MAGIC,
};
use k256::ecdsa::SigningKey;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy)]
enum Reply {
    Magic,
    Reject,
    Fail,
    Hang,
}

struct MockChain {
    reply: Reply,
    calls: Mutex<Vec<(Address, Vec<u8>)>>,
}

impl MockChain {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        self.calls.lock().push((*to, data.to_vec()));
        match self.reply {
            Reply::Magic => {
                let mut word = vec![0u8; 32];
                word[..4].copy_from_slice(&ERC1271_MAGIC);
                Ok(word)
            }
            Reply::Reject => Ok(vec![0u8; 32]),
            Reply::Fail => Err(RpcError::InvalidResponse("execution reverted".to_string())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

fn make_key() -> SigningKey {
    SigningKey::from_slice(&[0x42; 32]).unwrap()
}

fn make_signature(key: &SigningKey, hash: &[u8; 32], v_offset: u8) -> Vec<u8> {
    let (sig, recid) = key.sign_prehash_recoverable(hash).unwrap();
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recid.to_byte() + v_offset);
    bytes
}

fn make_verifier(chain: Arc<MockChain>) -> SignatureVerifier {
    SignatureVerifier::new(chain, Duration::from_millis(200))
}

#[tokio::test]
async fn account_signature_verifies_without_contract_call() {
    let key = make_key();
    let signer = public_key_address(key.verifying_key());
    let chain = MockChain::new(Reply::Reject);
    let verifier = make_verifier(chain.clone());

    let mut seen = Vec::new();
    for i in 0..16u8 {
        let hash = personal_message_hash(&[i]);
        let sig = make_signature(&key, &hash, 27);
        seen.push(sig[64]);
        assert!(verifier.verify(&hash, &sig, &signer).await.unwrap());
    }
    assert!(seen.iter().all(|v| *v == 27 || *v == 28));
    assert_eq!(chain.call_count(), 0);
}

#[tokio::test]
async fn raw_recovery_byte_fails_account_stage() {
    let key = make_key();
    let signer = public_key_address(key.verifying_key());
    let hash = personal_message_hash(br#"{"claims":[]}"#);
    let chain = MockChain::new(Reply::Reject);
    let verifier = make_verifier(chain.clone());

    let sig = make_signature(&key, &hash, 0);
    let err = verifier.verify(&hash, &sig, &signer).await.unwrap_err();
    match &err {
        SignatureError::Joined { eoa, contract } => {
            assert!(matches!(**eoa, SignatureError::InvalidRecoveryId(v) if v == sig[64]));
            assert!(matches!(**contract, SignatureError::ContractRejected { .. }));
        }
        other => panic!("expected joined error, got {other:?}"),
    }
    assert_eq!(chain.call_count(), 1);
}

#[tokio::test]
async fn wrong_length_never_reaches_contract() {
    let key = make_key();
    let signer = public_key_address(key.verifying_key());
    let hash = personal_message_hash(b"payload");
    let chain = MockChain::new(Reply::Magic);
    let verifier = make_verifier(chain.clone());

    let sig = make_signature(&key, &hash, 27);
    for bad in [sig[..64].to_vec(), [sig.clone(), vec![0]].concat()] {
        let err = verifier.verify(&hash, &bad, &signer).await.unwrap_err();
        assert!(matches!(err, SignatureError::InvalidLength { .. }));
    }
    assert_eq!(chain.call_count(), 0);
}

#[tokio::test]
async fn contract_wallet_is_asked_when_recovery_mismatches() {
    let key = make_key();
    let wallet = Address::new([0x77; 20]);
    let hash = personal_message_hash(b"payload");
    let chain = MockChain::new(Reply::Magic);
    let verifier = make_verifier(chain.clone());

    let sig = make_signature(&key, &hash, 27);
    assert!(verifier.verify(&hash, &sig, &wallet).await.unwrap());

    let calls = chain.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, wallet);
    assert_eq!(&calls[0].1[..4], &ERC1271_MAGIC);
    assert_eq!(&calls[0].1[4..36], &hash);
}

#[tokio::test]
async fn both_failures_are_joined() {
    let key = make_key();
    let wallet = Address::new([0x77; 20]);
    let hash = personal_message_hash(b"payload");
    let verifier = make_verifier(MockChain::new(Reply::Reject));

    let sig = make_signature(&key, &hash, 27);
    let err = verifier.verify(&hash, &sig, &wallet).await.unwrap_err();

    match &err {
        SignatureError::Joined { eoa, contract } => {
            assert!(matches!(**eoa, SignatureError::AddressMismatch { .. }));
            assert!(matches!(**contract, SignatureError::ContractRejected { .. }));
        }
        other => panic!("expected joined error, got {other:?}"),
    }
    let text = err.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("does not match"));
    assert!(lines[1].contains("rejected"));
}

#[tokio::test]
async fn rpc_failure_and_timeout_surface_in_contract_branch() {
    let key = make_key();
    let wallet = Address::new([0x77; 20]);
    let hash = personal_message_hash(b"payload");
    let sig = make_signature(&key, &hash, 27);

    let err = make_verifier(MockChain::new(Reply::Fail))
        .verify(&hash, &sig, &wallet)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SignatureError::Joined { ref contract, .. }
            if matches!(**contract, SignatureError::Rpc(RpcError::InvalidResponse(_)))
    ));

    let err = make_verifier(MockChain::new(Reply::Hang))
        .verify(&hash, &sig, &wallet)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SignatureError::Joined { ref contract, .. }
            if matches!(**contract, SignatureError::Rpc(RpcError::Timeout(_)))
    ));
}

#[tokio::test]
async fn bad_recovery_byte_still_tries_contract() {
    let key = make_key();
    let wallet = Address::new([0x77; 20]);
    let hash = personal_message_hash(b"payload");
    let chain = MockChain::new(Reply::Reject);
    let verifier = make_verifier(chain.clone());

    let mut sig = make_signature(&key, &hash, 27);
    sig[64] = 31;
    let err = verifier.verify(&hash, &sig, &wallet).await.unwrap_err();
    assert!(matches!(
        err,
        SignatureError::Joined { ref eoa, .. } if matches!(**eoa, SignatureError::InvalidRecoveryId(31))
    ));
    assert_eq!(chain.call_count(), 1);
}
