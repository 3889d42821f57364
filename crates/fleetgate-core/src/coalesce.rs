//! Latitude, longitude and HDOP coalescing.
//!
//! Field devices report one location fix as up to three separate signals with
//! independent timestamps. Readings that fall within [`COALESCE_WINDOW`] of
//! the first member of a group are merged into one
//! [`COORDINATES_SIGNAL`](fleetgate_schemas::COORDINATES_SIGNAL) signal.

use chrono::{DateTime, Utc};
use fleetgate_schemas::{
    LocationValue, Signal, SignalValue, COORDINATES_SIGNAL, HDOP_SIGNAL, LATITUDE_SIGNAL,
    LONGITUDE_SIGNAL,
};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Maximum spread between the members of one location fix.
pub const COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// Non-fatal problem found while coalescing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoalesceError {
    /// Both coordinates were exactly zero; treated as a sentinel, not a fix.
    #[error("latitude/longitude at origin at {timestamp}")]
    LatLonAtOrigin {
        /// Timestamp of the earliest member.
        timestamp: DateTime<Utc>,
    },
    /// Latitude or longitude arrived without its counterpart.
    #[error("unpaired coordinate {name} at {timestamp}")]
    UnpairedCoordinate {
        /// Name of the lone signal.
        name: String,
        /// Its timestamp.
        timestamp: DateTime<Utc>,
    },
}

/// Output of [`coalesce`]. `signals` is always usable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coalesced {
    /// Remaining input signals followed by the combined location signals.
    pub signals: Vec<Signal>,
    /// Problems found along the way.
    pub diagnostics: Vec<CoalesceError>,
}

/// Every diagnostic from one pass, one per line.
#[derive(Debug, Clone, PartialEq)]
pub struct CoalesceErrors(pub Vec<CoalesceError>);

impl fmt::Display for CoalesceErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

impl std::error::Error for CoalesceErrors {}

impl Coalesced {
    /// Splits into the signals and, when there were diagnostics, their join.
    pub fn into_result(self) -> (Vec<Signal>, Result<(), CoalesceErrors>) {
        let outcome = if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(CoalesceErrors(self.diagnostics))
        };
        (self.signals, outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Latitude,
    Longitude,
    Hdop,
}

impl Slot {
    fn of(signal: &Signal) -> Option<Slot> {
        let slot = match signal.name.as_str() {
            LATITUDE_SIGNAL => Slot::Latitude,
            LONGITUDE_SIGNAL => Slot::Longitude,
            HDOP_SIGNAL => Slot::Hdop,
            _ => return None,
        };
        signal.value.as_number().map(|_| slot)
    }
}

#[derive(Default)]
struct Triple {
    latitude: Option<usize>,
    longitude: Option<usize>,
    hdop: Option<usize>,
    started: Option<DateTime<Utc>>,
}

impl Triple {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<usize> {
        match slot {
            Slot::Latitude => &mut self.latitude,
            Slot::Longitude => &mut self.longitude,
            Slot::Hdop => &mut self.hdop,
        }
    }

    fn earliest(&self) -> Option<usize> {
        [self.latitude, self.longitude, self.hdop]
            .into_iter()
            .flatten()
            .min()
    }
}

struct Pass<'a> {
    signals: &'a [Signal],
    pruned: Vec<bool>,
    combined: Vec<Signal>,
    diagnostics: Vec<CoalesceError>,
}

impl Pass<'_> {
    fn value(&self, index: usize) -> f64 {
        self.signals[index].value.as_number().unwrap_or_default()
    }

    fn resolve(&mut self, triple: &mut Triple) {
        let Some(first) = triple.earliest() else {
            *triple = Triple::default();
            return;
        };
        let hdop = triple.hdop.map(|i| self.value(i));

        match (triple.latitude, triple.longitude) {
            (Some(lat), Some(lon)) => {
                self.pruned[lat] = true;
                self.pruned[lon] = true;
                let (latitude, longitude) = (self.value(lat), self.value(lon));
                if latitude == 0.0 && longitude == 0.0 {
                    self.diagnostics.push(CoalesceError::LatLonAtOrigin {
                        timestamp: self.signals[first].timestamp,
                    });
                    self.emit_hdop_only(triple, hdop);
                } else {
                    if let Some(i) = triple.hdop {
                        self.pruned[i] = true;
                    }
                    let value = LocationValue {
                        latitude: Some(latitude),
                        longitude: Some(longitude),
                        hdop,
                    };
                    self.combined.push(
                        self.signals[first].derive(COORDINATES_SIGNAL, SignalValue::Location(value)),
                    );
                }
            }
            (Some(lone), None) | (None, Some(lone)) => {
                self.pruned[lone] = true;
                self.diagnostics.push(CoalesceError::UnpairedCoordinate {
                    name: self.signals[lone].name.clone(),
                    timestamp: self.signals[lone].timestamp,
                });
                self.emit_hdop_only(triple, hdop);
            }
            (None, None) => self.emit_hdop_only(triple, hdop),
        }

        *triple = Triple::default();
    }

    fn emit_hdop_only(&mut self, triple: &Triple, hdop: Option<f64>) {
        if let (Some(i), Some(hdop)) = (triple.hdop, hdop) {
            self.pruned[i] = true;
            let value = LocationValue {
                hdop: Some(hdop),
                ..Default::default()
            };
            self.combined
                .push(self.signals[i].derive(COORDINATES_SIGNAL, SignalValue::Location(value)));
        }
    }
}

/// Merges location components into combined signals.
///
/// Signals are ordered by timestamp then name. Other signals pass through
/// untouched; latitude, longitude and HDOP readings are grouped while they
/// stay within [`COALESCE_WINDOW`] of the group's first member and do not
/// collide with an occupied slot.
pub fn coalesce(mut signals: Vec<Signal>) -> Coalesced {
    signals.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut pass = Pass {
        signals: &signals,
        pruned: vec![false; signals.len()],
        combined: Vec::new(),
        diagnostics: Vec::new(),
    };
    let mut triple = Triple::default();

    for (index, signal) in signals.iter().enumerate() {
        if let Some(started) = triple.started {
            let elapsed = (signal.timestamp - started).num_milliseconds();
            if elapsed >= COALESCE_WINDOW.as_millis() as i64 {
                pass.resolve(&mut triple);
            }
        }

        let Some(slot) = Slot::of(signal) else {
            continue;
        };
        if triple.slot_mut(slot).is_some() {
            pass.resolve(&mut triple);
        }
        *triple.slot_mut(slot) = Some(index);
        triple.started.get_or_insert(signal.timestamp);
    }
    pass.resolve(&mut triple);

    let Pass {
        pruned,
        combined,
        diagnostics,
        ..
    } = pass;

    let mut out: Vec<Signal> = signals
        .into_iter()
        .zip(pruned)
        .filter_map(|(signal, pruned)| (!pruned).then_some(signal))
        .collect();
    out.extend(combined);

    Coalesced {
        signals: out,
        diagnostics,
    }
}
