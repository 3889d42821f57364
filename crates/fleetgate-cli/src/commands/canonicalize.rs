//! Canonicalize command implementation.

use fleetgate_canonical::{Canonicalizer, ContentValidity, RawEnvelope};
use fleetgate_index::{encode, encode_partial, IndexKey};
use serde_json::json;

use crate::commands::read_input;
use crate::config::load_options;
use crate::output::{envelope_json, format_json};

pub fn run(
    input: Option<String>,
    source: String,
    config: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_input(input.as_deref())?;
    let mut envelope =
        RawEnvelope::from_json_slice(&bytes).map_err(|e| format!("Invalid envelope: {}", e))?;

    let options = load_options(config.as_deref())?;
    let canonicalizer = Canonicalizer::new(options.canonicalizer_options());
    let fallback_id = format!("cli-{}", chrono::Utc::now().timestamp_millis());
    let report = canonicalizer
        .canonicalize(&mut envelope.header, &source, &fallback_id)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    let index_key = if report.validity == ContentValidity::Valid {
        encode(&IndexKey::from_header(&envelope.header)?)?
    } else {
        encode_partial(&IndexKey::partial_from_header(&envelope.header))?
    };

    let output = json!({
        "envelope": envelope_json(&envelope)?,
        "report": report,
        "index_key": index_key,
    });
    println!("{}", format_json(&output));
    Ok(())
}
