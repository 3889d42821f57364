//! Verify-signature command implementation.

use fleetgate_canonical::Address;
use fleetgate_core::{personal_message_hash, SignatureVerifier};
use serde_json::json;

use crate::commands::read_input;
use crate::config::{chain_client, load_options};
use crate::output::format_json;

pub struct VerifyArgs {
    pub signer: String,
    pub signature: String,
    pub payload: Option<String>,
    pub hash: Option<String>,
    pub config: Option<String>,
    pub rpc_url: Option<String>,
    pub json: bool,
}

fn decode_hex(label: &str, value: &str) -> Result<Vec<u8>, String> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| format!("Invalid {} hex: {}", label, e))
}

pub fn run(args: VerifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let signer = Address::parse(&args.signer).map_err(|e| format!("Invalid signer: {}", e))?;
    let signature = decode_hex("signature", &args.signature)?;

    let hash: [u8; 32] = match &args.hash {
        Some(hash) => decode_hex("hash", hash)?
            .try_into()
            .map_err(|_| "Hash must be 32 bytes".to_string())?,
        None => personal_message_hash(&read_input(args.payload.as_deref())?),
    };

    let options = load_options(args.config.as_deref())?;
    let verifier = SignatureVerifier::new(
        chain_client(args.rpc_url.as_deref(), &options)?,
        options.rpc_timeout(),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(verifier.verify(&hash, &signature, &signer));

    if args.json {
        let report = match &outcome {
            Ok(valid) => json!({ "signer": signer, "hash": format!("0x{}", hex::encode(hash)), "valid": valid }),
            Err(e) => json!({ "signer": signer, "hash": format!("0x{}", hex::encode(hash)), "valid": false, "error": e.to_string() }),
        };
        println!("{}", format_json(&report));
    } else if outcome.is_ok() {
        println!("Signature valid for {}", signer);
    }

    outcome.map_err(|e| format!("Signature verification failed:\n{}", e))?;
    Ok(())
}
