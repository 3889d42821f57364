use chrono::{DateTime, Utc};
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::header::{
    EventHeader, DEFAULT_CONTENT_TYPE, SPEC_VERSION, TYPE_FINGERPRINT, TYPE_STATUS, TYPE_UNKNOWN,
};
use crate::identifiers::{Did, LegacyNftDid};
use crate::ratelimit::{RateLimitedLog, DEFAULT_CAPACITY};
use crate::validation::{check_field, ValidationError};
use crate::validity::{CanonicalReport, ContentValidity};

/// Tunables for [`Canonicalizer`].
#[derive(Debug, Clone)]
pub struct CanonicalizerOptions {
    /// How far in the future an event time may lie before it is reported.
    pub max_clock_skew: Duration,
    /// Minimum spacing between future-time warnings per producer.
    pub future_log_interval: Duration,
    /// Minimum spacing between legacy-identifier warnings per producer.
    pub legacy_log_interval: Duration,
    /// Producers tracked by each rate-limited log.
    pub rate_limit_capacity: NonZeroUsize,
}

impl Default for CanonicalizerOptions {
    fn default() -> Self {
        Self {
            max_clock_skew: Duration::from_secs(5 * 60),
            future_log_interval: Duration::from_secs(10 * 60),
            legacy_log_interval: Duration::from_secs(24 * 60 * 60),
            rate_limit_capacity: NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Result of checking one identifier field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierCheck {
    Current,
    Migrated,
    Unrecognized,
}

/// Fills defaults, validates and migrates event headers.
///
/// Shared across concurrent messages; the only mutable state is the two
/// rate-limited logs.
#[derive(Debug)]
pub struct Canonicalizer {
    max_clock_skew: Duration,
    future_log: RateLimitedLog,
    legacy_log: RateLimitedLog,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(CanonicalizerOptions::default())
    }
}

impl Canonicalizer {
    /// Creates a canonicalizer from options.
    pub fn new(options: CanonicalizerOptions) -> Self {
        Self {
            max_clock_skew: options.max_clock_skew,
            future_log: RateLimitedLog::new(
                options.future_log_interval,
                options.rate_limit_capacity,
            ),
            legacy_log: RateLimitedLog::new(
                options.legacy_log_interval,
                options.rate_limit_capacity,
            ),
        }
    }

    /// Canonicalizes `header` in place.
    ///
    /// `source_identity` is the transport-verified identity and always replaces
    /// the header's `source`. `fallback_id` is used when the header has no id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for the first field that is missing or
    /// contains characters outside the restricted class.
    pub fn canonicalize(
        &self,
        header: &mut EventHeader,
        source_identity: &str,
        fallback_id: &str,
    ) -> Result<CanonicalReport, ValidationError> {
        self.canonicalize_at(header, source_identity, fallback_id, Utc::now())
    }

    /// Same as [`canonicalize`](Self::canonicalize) with an explicit ingestion time.
    pub fn canonicalize_at(
        &self,
        header: &mut EventHeader,
        source_identity: &str,
        fallback_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CanonicalReport, ValidationError> {
        header.source = source_identity.to_string();

        if header.has_zero_time() {
            header.time = now;
        }
        if header.id.is_empty() {
            header.id = fallback_id.to_string();
        }
        header.spec_version = SPEC_VERSION.to_string();
        if header.data_content_type.is_empty() {
            header.data_content_type = DEFAULT_CONTENT_TYPE.to_string();
        }

        validate_fields(header)?;

        let mut report = CanonicalReport::valid();
        let log_key = header.producer.clone();

        match self.check_identifier("subject", &mut header.subject, &log_key) {
            IdentifierCheck::Current => {}
            IdentifierCheck::Migrated => report.migrated_fields.push("subject"),
            IdentifierCheck::Unrecognized => report.validity = ContentValidity::Partial,
        }
        match self.check_identifier("producer", &mut header.producer, &log_key) {
            IdentifierCheck::Current => {}
            IdentifierCheck::Migrated => report.migrated_fields.push("producer"),
            IdentifierCheck::Unrecognized => report.validity = ContentValidity::Partial,
        }

        let skew = chrono::Duration::from_std(self.max_clock_skew)
            .unwrap_or_else(|_| chrono::Duration::zero());
        if header.time > now + skew {
            report.future_time = true;
            if self.future_log.should_log(&header.producer) {
                tracing::warn!(
                    producer = %header.producer,
                    time = %header.time,
                    now = %now,
                    "event time is in the future beyond allowed clock skew"
                );
            }
        }

        Ok(report)
    }

    /// Applies the connection-path type gate.
    ///
    /// Status and fingerprint events are accepted as-is; the unknown marker
    /// type is accepted with a degraded validity.
    pub fn check_connection_type(
        &self,
        header: &EventHeader,
    ) -> Result<ContentValidity, ValidationError> {
        match header.event_type.as_str() {
            TYPE_STATUS | TYPE_FINGERPRINT => Ok(ContentValidity::Valid),
            TYPE_UNKNOWN => Ok(ContentValidity::UnknownType),
            other => Err(ValidationError::UnsupportedType(other.to_string())),
        }
    }

    fn check_identifier(
        &self,
        field: &'static str,
        value: &mut String,
        log_key: &str,
    ) -> IdentifierCheck {
        if Did::parse(value).is_ok() {
            return IdentifierCheck::Current;
        }
        match LegacyNftDid::parse(value) {
            Ok(legacy) => {
                let current = legacy.into_current().to_string();
                if self.legacy_log.should_log(log_key) {
                    tracing::warn!(
                        field,
                        legacy = %value,
                        current = %current,
                        "rewrote deprecated identifier format"
                    );
                }
                *value = current;
                IdentifierCheck::Migrated
            }
            Err(_) => {
                tracing::debug!(field, value = %value, "identifier in unrecognized format");
                IdentifierCheck::Unrecognized
            }
        }
    }
}

fn validate_fields(header: &EventHeader) -> Result<(), ValidationError> {
    for (field, value) in [
        ("source", &header.source),
        ("producer", &header.producer),
        ("subject", &header.subject),
        ("type", &header.event_type),
    ] {
        if value.is_empty() {
            return Err(ValidationError::MissingField { field });
        }
    }

    check_field("id", &header.id)?;
    check_field("source", &header.source)?;
    check_field("producer", &header.producer)?;
    check_field("subject", &header.subject)?;
    check_field("type", &header.event_type)?;
    check_field("specversion", &header.spec_version)?;
    check_field("datacontenttype", &header.data_content_type)?;
    if let Some(schema) = &header.data_schema {
        check_field("dataschema", schema)?;
    }
    if let Some(version) = &header.data_version {
        check_field("dataversion", version)?;
    }
    Ok(())
}
