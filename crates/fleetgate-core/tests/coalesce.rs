use chrono::{DateTime, Duration, TimeZone, Utc};
use fleetgate_core::{coalesce, CoalesceError};
use fleetgate_schemas::{
    LocationValue, Signal, SignalValue, COORDINATES_SIGNAL, HDOP_SIGNAL, LATITUDE_SIGNAL,
    LONGITUDE_SIGNAL,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn make_signal(name: &str, value: f64, offset_ms: i64) -> Signal {
    Signal {
        token_id: 42,
        timestamp: t0() + Duration::milliseconds(offset_ms),
        name: name.to_string(),
        value: SignalValue::Number(value),
        source: "0x55bf1c27d468314ea119cf74979e2b59f962295c".to_string(),
        producer: "did:erc721:137:0x9c94c395cbcbde662235e0a9d3bb87ad708561ba:7".to_string(),
        cloud_event_id: format!("evt-{}", offset_ms),
    }
}

fn location(signal: &Signal) -> LocationValue {
    *signal.value.as_location().expect("location signal")
}

#[test]
fn same_instant_pair_is_combined() {
    let out = coalesce(vec![
        make_signal(LATITUDE_SIGNAL, 45.5, 0),
        make_signal(LONGITUDE_SIGNAL, -122.6, 0),
    ]);

    assert!(out.diagnostics.is_empty());
    assert_eq!(out.signals.len(), 1);
    assert_eq!(out.signals[0].name, COORDINATES_SIGNAL);
    assert_eq!(location(&out.signals[0]), LocationValue::coordinates(45.5, -122.6));
}

#[test]
fn origin_pair_is_dropped_with_diagnostic() {
    let out = coalesce(vec![
        make_signal(LATITUDE_SIGNAL, 0.0, 0),
        make_signal(LONGITUDE_SIGNAL, 0.0, 0),
    ]);

    assert!(out.signals.is_empty());
    assert_eq!(out.diagnostics, vec![CoalesceError::LatLonAtOrigin { timestamp: t0() }]);
    assert!(out.into_result().1.is_err());
}

#[test]
fn gap_of_window_or_more_leaves_both_unpaired() {
    let out = coalesce(vec![
        make_signal(LATITUDE_SIGNAL, 45.5, 0),
        make_signal(LONGITUDE_SIGNAL, -122.6, 600),
    ]);

    assert!(out.signals.is_empty());
    assert_eq!(out.diagnostics.len(), 2);
    assert!(out
        .diagnostics
        .iter()
        .all(|d| matches!(d, CoalesceError::UnpairedCoordinate { .. })));

    let out = coalesce(vec![
        make_signal(LATITUDE_SIGNAL, 45.5, 0),
        make_signal(LONGITUDE_SIGNAL, -122.6, 500),
    ]);
    assert!(out.signals.is_empty());
    assert_eq!(out.diagnostics.len(), 2);
}

#[test]
fn pair_within_window_uses_earliest_timestamp() {
    let out = coalesce(vec![
        make_signal(LONGITUDE_SIGNAL, -122.6, 200),
        make_signal(LATITUDE_SIGNAL, 45.5, 0),
    ]);

    assert_eq!(out.signals.len(), 1);
    assert_eq!(out.signals[0].timestamp, t0());
    assert_eq!(out.signals[0].cloud_event_id, "evt-0");
}

#[test]
fn hdop_joins_the_fix() {
    let out = coalesce(vec![
        make_signal(LATITUDE_SIGNAL, 45.5, 0),
        make_signal(HDOP_SIGNAL, 1.2, 100),
        make_signal(LONGITUDE_SIGNAL, -122.6, 300),
    ]);

    assert!(out.diagnostics.is_empty());
    assert_eq!(out.signals.len(), 1);
    assert_eq!(
        location(&out.signals[0]),
        LocationValue {
            latitude: Some(45.5),
            longitude: Some(-122.6),
            hdop: Some(1.2),
        }
    );
}

#[test]
fn lone_hdop_is_still_emitted() {
    let out = coalesce(vec![
        make_signal(HDOP_SIGNAL, 0.9, 0),
        make_signal(LATITUDE_SIGNAL, 45.5, 100),
    ]);

    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.signals.len(), 1);
    assert_eq!(
        location(&out.signals[0]),
        LocationValue {
            hdop: Some(0.9),
            ..Default::default()
        }
    );
}

#[test]
fn slot_collision_flushes_previous_triple() {
    let out = coalesce(vec![
        make_signal(LATITUDE_SIGNAL, 45.5, 0),
        make_signal(LATITUDE_SIGNAL, 45.6, 100),
        make_signal(LONGITUDE_SIGNAL, -122.6, 150),
    ]);

    assert_eq!(
        out.diagnostics,
        vec![CoalesceError::UnpairedCoordinate {
            name: LATITUDE_SIGNAL.to_string(),
            timestamp: t0(),
        }]
    );
    assert_eq!(out.signals.len(), 1);
    assert_eq!(location(&out.signals[0]), LocationValue::coordinates(45.6, -122.6));
    assert_eq!(out.signals[0].timestamp, t0() + Duration::milliseconds(100));
}

#[test]
fn other_signals_pass_through_before_combined_ones() {
    let out = coalesce(vec![
        make_signal("speed", 88.0, 300),
        make_signal(LATITUDE_SIGNAL, 45.5, 0),
        make_signal(LONGITUDE_SIGNAL, -122.6, 0),
        make_signal("odometer", 1000.0, 0),
    ]);

    let names: Vec<&str> = out.signals.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["odometer", "speed", COORDINATES_SIGNAL]);
    let (signals, result) = out.into_result();
    assert_eq!(signals.len(), 3);
    assert!(result.is_ok());
}
