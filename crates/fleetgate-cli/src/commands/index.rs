//! Index key commands.

use fleetgate_canonical::RawEnvelope;
use fleetgate_index::{decode, encode, encode_partial, IndexKey};
use serde_json::json;

use crate::commands::read_input;
use crate::output::format_json;

/// Encodes the index key for an already canonical envelope.
pub fn encode_key(input: Option<String>, partial: bool) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_input(input.as_deref())?;
    let envelope =
        RawEnvelope::from_json_slice(&bytes).map_err(|e| format!("Invalid envelope: {}", e))?;

    let key = if partial {
        encode_partial(&IndexKey::partial_from_header(&envelope.header))?
    } else {
        encode(&IndexKey::from_header(&envelope.header)?)?
    };
    println!("{}", key);
    Ok(())
}

/// Prints the fields of an index key.
pub fn decode_key(key: String, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let decoded = decode(&key)?;
    let subject = match (decoded.key.subject.address, decoded.key.subject.token_id) {
        (Some(address), _) => json!({ "address": address }),
        (None, Some(token_id)) => json!({ "token_id": token_id }),
        (None, None) => json!(null),
    };
    let timestamp = decoded
        .key
        .timestamp
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

    if json_output {
        let report = json!({
            "timestamp": timestamp,
            "primary_filler": decoded.key.primary_filler,
            "data_type": decoded.key.data_type,
            "subject": subject,
            "secondary_filler": decoded.key.secondary_filler,
            "partial": decoded.partial,
        });
        println!("{}", format_json(&report));
    } else {
        println!("Timestamp:  {}", timestamp);
        println!("Data type:  {}", decoded.key.data_type);
        println!("Subject:    {}", subject);
        println!("Fillers:    {} / {}", decoded.key.primary_filler, decoded.key.secondary_filler);
        println!("Partial:    {}", decoded.partial);
    }
    Ok(())
}
