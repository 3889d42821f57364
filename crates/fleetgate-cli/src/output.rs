//! Output formatting utilities.

use fleetgate_canonical::RawEnvelope;
use fleetgate_core::EnvelopeMetadata;
use serde_json::Value;

/// Formats a value as pretty JSON.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Converts an envelope back to its wire JSON.
pub fn envelope_json(envelope: &RawEnvelope) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(&envelope.to_json_vec()?)
}

/// Formats envelope metadata as a simple table row.
pub fn format_table_row(metadata: &EnvelopeMetadata) -> String {
    format!(
        "{:<83} {:<18} {:<22} {}",
        metadata.index_key,
        metadata.validity.as_str(),
        truncate(&metadata.event_type, 22),
        metadata.id
    )
}

/// Prints table header.
#[allow(clippy::print_literal)]
pub fn print_table_header() {
    println!(
        "{:<83} {:<18} {:<22} {}",
        "INDEX_KEY", "VALIDITY", "TYPE", "ID"
    );
    println!("{}", "-".repeat(140));
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}
