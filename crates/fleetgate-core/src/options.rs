use fleetgate_canonical::CanonicalizerOptions;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Pipeline tunables. Every field has a default, so a partial JSON document
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Limit for one vendor decode, in milliseconds (default: 5000).
    pub decode_timeout_ms: u64,
    /// Limit for the ERC-1271 contract call, in milliseconds (default: 10000).
    pub rpc_timeout_ms: u64,
    /// Allowed clock skew before an event time counts as future, in seconds (default: 300).
    pub max_clock_skew_secs: u64,
    /// Spacing of future-time warnings per producer, in seconds (default: 600).
    pub future_log_interval_secs: u64,
    /// Spacing of legacy-identifier warnings per producer, in seconds (default: 86400).
    pub legacy_log_interval_secs: u64,
    /// Producers tracked by each rate-limited log (default: 1024).
    pub rate_limit_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            decode_timeout_ms: 5_000,
            rpc_timeout_ms: 10_000,
            max_clock_skew_secs: 5 * 60,
            future_log_interval_secs: 10 * 60,
            legacy_log_interval_secs: 24 * 60 * 60,
            rate_limit_capacity: 1024,
        }
    }
}

impl PipelineOptions {
    /// Decode limit.
    pub fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }

    /// Contract call limit.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Options for the header canonicalizer. A zero capacity is raised to one.
    pub fn canonicalizer_options(&self) -> CanonicalizerOptions {
        CanonicalizerOptions {
            max_clock_skew: Duration::from_secs(self.max_clock_skew_secs),
            future_log_interval: Duration::from_secs(self.future_log_interval_secs),
            legacy_log_interval: Duration::from_secs(self.legacy_log_interval_secs),
            rate_limit_capacity: NonZeroUsize::new(self.rate_limit_capacity)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let options: PipelineOptions =
            serde_json::from_str(r#"{ "rpc_timeout_ms": 250 }"#).unwrap();
        assert_eq!(options.rpc_timeout(), Duration::from_millis(250));
        assert_eq!(options.decode_timeout(), Duration::from_secs(5));
        assert_eq!(
            options.canonicalizer_options().legacy_log_interval,
            Duration::from_secs(86_400)
        );
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let options = PipelineOptions {
            rate_limit_capacity: 0,
            ..Default::default()
        };
        assert_eq!(options.canonicalizer_options().rate_limit_capacity.get(), 1);
    }
}
