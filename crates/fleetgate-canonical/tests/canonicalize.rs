use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use fleetgate_canonical::{
    CanonicalReport, Canonicalizer, CanonicalizerOptions, ContentValidity, EventHeader,
    ValidationError, TYPE_ATTESTATION, TYPE_FINGERPRINT, TYPE_STATUS, TYPE_UNKNOWN,
};
use std::time::Duration;

const VEHICLE: &str = "did:erc721:137:0xba5738a18d83d41847dffbdc6101d37c69c9b0cf:42";
const DEVICE: &str = "did:erc721:137:0x9c94c395cbcbde662235e0a9d3bb87ad708561ba:7";
const LEGACY_VEHICLE: &str = "did:nft:137:0xbA5738a18d83D41847dfFbDC6101d37C69c9B0cF_42";
const LEGACY_DEVICE: &str = "did:nft:137:0x9c94C395cBcBDe662235E0A9d3bB87Ad708561BA_7";
const SOURCE: &str = "0x55BF1c27d468314Ea119CF74979E2b59F962295c";

fn make_header() -> EventHeader {
    EventHeader {
        id: "2pcYwspbaBFJ7NPGZ2kivkuJ12a".to_string(),
        source: "spoofed".to_string(),
        producer: DEVICE.to_string(),
        subject: VEHICLE.to_string(),
        time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        event_type: TYPE_STATUS.to_string(),
        ..Default::default()
    }
}

fn canonicalize(header: &mut EventHeader) -> Result<CanonicalReport, ValidationError> {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 5).unwrap();
    Canonicalizer::default().canonicalize_at(header, SOURCE, "fallback-id", now)
}

#[test]
fn source_is_always_overwritten() {
    let mut header = make_header();
    canonicalize(&mut header).unwrap();
    assert_eq!(header.source, SOURCE);
}

#[test]
fn defaults_are_filled() {
    let mut header = make_header();
    header.id.clear();
    header.time = Default::default();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 5).unwrap();

    let report = Canonicalizer::default()
        .canonicalize_at(&mut header, SOURCE, "fallback-id", now)
        .unwrap();

    assert_eq!(header.id, "fallback-id");
    assert_eq!(header.time, now);
    assert_eq!(header.spec_version, "1.0");
    assert_eq!(header.data_content_type, "application/json");
    assert_eq!(report, CanonicalReport::valid());
}

#[test]
fn existing_values_are_kept() {
    let mut header = make_header();
    header.spec_version = "1.0".to_string();
    header.data_content_type = "application/cbor".to_string();
    canonicalize(&mut header).unwrap();
    assert_eq!(header.id, "2pcYwspbaBFJ7NPGZ2kivkuJ12a");
    assert_eq!(header.data_content_type, "application/cbor");
    assert_eq!(
        header.time,
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    );
}

#[test]
fn spec_version_is_always_stamped() {
    for supplied in ["0.3", "1.0\n", ""] {
        let mut header = make_header();
        header.spec_version = supplied.to_string();
        canonicalize(&mut header).unwrap();
        assert_eq!(header.spec_version, "1.0");
    }
}

#[test]
fn invalid_characters_name_the_field() {
    let cases: [(&str, fn(&mut EventHeader)); 7] = [
        ("id", |h: &mut EventHeader| h.id = "abc;drop".to_string()),
        ("producer", |h: &mut EventHeader| h.producer = "did:erc721:1:0x<script>".to_string()),
        ("subject", |h: &mut EventHeader| h.subject = "veh\u{00e9}icle".to_string()),
        ("type", |h: &mut EventHeader| h.event_type = "fleetgate.status!".to_string()),
        ("datacontenttype", |h: &mut EventHeader| h.data_content_type = "application/json;charset=utf8".to_string()),
        ("dataschema", |h: &mut EventHeader| h.data_schema = Some("https://example.com/s?x=1".to_string())),
        ("dataversion", |h: &mut EventHeader| h.data_version = Some("v1#2".to_string())),
    ];

    for (expected, mutate) in cases {
        let mut header = make_header();
        mutate(&mut header);
        match canonicalize(&mut header) {
            Err(ValidationError::InvalidCharacters { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected InvalidCharacters for {expected}, got {other:?}"),
        }
    }
}

#[test]
fn untrusted_source_identity_is_validated() {
    let mut header = make_header();
    let now = Utc::now();
    let err = Canonicalizer::default()
        .canonicalize_at(&mut header, "bad|source", "fallback", now)
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidCharacters {
            field: "source",
            value: "bad|source".to_string()
        }
    );
}

#[test]
fn extras_are_not_character_checked() {
    let mut header = make_header();
    header
        .extras
        .insert("note".to_string(), serde_json::json!("anything <goes> here; really"));
    assert!(canonicalize(&mut header).is_ok());
}

#[test]
fn missing_required_fields_are_rejected() {
    let mut header = make_header();
    header.event_type.clear();
    assert_eq!(
        canonicalize(&mut header).unwrap_err(),
        ValidationError::MissingField { field: "type" }
    );

    let mut header = make_header();
    header.subject.clear();
    assert_eq!(
        canonicalize(&mut header).unwrap_err(),
        ValidationError::MissingField { field: "subject" }
    );
}

#[test]
fn legacy_subject_and_producer_are_migrated() {
    let mut header = make_header();
    header.subject = LEGACY_VEHICLE.to_string();
    header.producer = LEGACY_DEVICE.to_string();

    let report = canonicalize(&mut header).unwrap();

    assert_eq!(header.subject, VEHICLE);
    assert_eq!(header.producer, DEVICE);
    assert_eq!(report.migrated_fields, vec!["subject", "producer"]);
    assert_eq!(report.validity, ContentValidity::Valid);
}

#[test]
fn unrecognized_identifier_marks_partial() {
    let mut header = make_header();
    header.subject = "vehicle 42".to_string();

    let report = canonicalize(&mut header).unwrap();

    assert_eq!(header.subject, "vehicle 42");
    assert_eq!(report.validity, ContentValidity::Partial);
    assert!(report.migrated_fields.is_empty());
}

#[test]
fn ethr_producer_is_current_format() {
    let mut header = make_header();
    header.producer = "did:ethr:137:0x55BF1c27d468314Ea119CF74979E2b59F962295c".to_string();
    let report = canonicalize(&mut header).unwrap();
    assert_eq!(report.validity, ContentValidity::Valid);
}

#[test]
fn future_time_is_reported_not_rejected() {
    let canonicalizer = Canonicalizer::new(CanonicalizerOptions {
        max_clock_skew: Duration::from_secs(60),
        ..Default::default()
    });
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let mut header = make_header();
    header.time = now + ChronoDuration::minutes(5);
    let report = canonicalizer
        .canonicalize_at(&mut header, SOURCE, "id", now)
        .unwrap();
    assert!(report.future_time);

    let mut header = make_header();
    header.time = now + ChronoDuration::seconds(30);
    let report = canonicalizer
        .canonicalize_at(&mut header, SOURCE, "id", now)
        .unwrap();
    assert!(!report.future_time);
}

#[test]
fn connection_type_gate() {
    let canonicalizer = Canonicalizer::default();
    let mut header = make_header();

    for accepted in [TYPE_STATUS, TYPE_FINGERPRINT] {
        header.event_type = accepted.to_string();
        assert_eq!(
            canonicalizer.check_connection_type(&header).unwrap(),
            ContentValidity::Valid
        );
    }

    header.event_type = TYPE_UNKNOWN.to_string();
    assert_eq!(
        canonicalizer.check_connection_type(&header).unwrap(),
        ContentValidity::UnknownType
    );

    header.event_type = TYPE_ATTESTATION.to_string();
    assert_eq!(
        canonicalizer.check_connection_type(&header).unwrap_err(),
        ValidationError::UnsupportedType(TYPE_ATTESTATION.to_string())
    );
}
