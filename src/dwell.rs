//! Dwell (hesitation) detection.
//!
//! A tagged state machine over the smoothed sample stream. A dwell is the
//! user staying within a small radius of an anchor point; once it has lasted
//! the minimum duration it materializes as a [`HesitationEvent`] and keeps
//! extending in place until the user moves away. Sub-threshold dwells are
//! never recorded.
//!
//! Event reuse on confirmation picks the first event in list order whose
//! anchor lies within the radius. A nearby stale event can therefore absorb
//! a new dwell; this matches the shipped behavior and is deliberately not
//! changed here (see DESIGN.md).

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::geo_utils::haversine_distance;
use crate::types::{HesitationEvent, PathPoint, SmoothedSample};

/// Detector state. `Confirmed` holds an index into the session's event list.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DwellState {
    Idle,
    Candidate {
        anchor_lat: f64,
        anchor_lon: f64,
        anchor_time: DateTime<Utc>,
    },
    Confirmed {
        event_index: usize,
    },
}

/// State machine consuming smoothed samples alongside the journey path.
#[derive(Debug)]
pub struct DwellDetector {
    state: DwellState,
    radius_meters: f64,
    min_seconds: i64,
}

impl DwellDetector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: DwellState::Idle,
            radius_meters: config.dwell_radius_meters,
            min_seconds: config.dwell_min_seconds,
        }
    }

    /// Feed one smoothed sample. `path` is the journey path with the current
    /// sample already appended as its last point; `events` is the journey's
    /// hesitation list, mutated in place. `next_id` is only called when a
    /// new event materializes.
    pub fn observe(
        &mut self,
        sample: &SmoothedSample,
        path: &[PathPoint],
        events: &mut Vec<HesitationEvent>,
        next_id: &mut dyn FnMut() -> String,
    ) {
        match self.state {
            DwellState::Idle => {
                if self.holds_still(sample, path) {
                    self.state = DwellState::Candidate {
                        anchor_lat: sample.lat,
                        anchor_lon: sample.lon,
                        anchor_time: sample.timestamp,
                    };
                }
            }
            DwellState::Candidate {
                anchor_lat,
                anchor_lon,
                anchor_time,
            } => {
                let dist = haversine_distance(anchor_lat, anchor_lon, sample.lat, sample.lon);
                if dist > self.radius_meters {
                    // Sub-threshold dwell; nothing recorded.
                    self.state = DwellState::Idle;
                } else if (sample.timestamp - anchor_time).num_seconds() >= self.min_seconds {
                    let index = self.materialize(
                        anchor_lat,
                        anchor_lon,
                        anchor_time,
                        sample.timestamp,
                        events,
                        next_id,
                    );
                    self.state = DwellState::Confirmed { event_index: index };
                }
            }
            DwellState::Confirmed { event_index } => {
                let event = &mut events[event_index];
                let dist =
                    haversine_distance(event.anchor_lat, event.anchor_lon, sample.lat, sample.lon);
                if dist <= self.radius_meters {
                    event.end_time = sample.timestamp;
                    event.duration_seconds = (event.end_time - event.start_time).num_seconds();
                } else {
                    // Duration is locked; the event is immutable from here on.
                    log::debug!(
                        "[DwellDetector] closed hesitation {} after {}s",
                        event.id,
                        event.duration_seconds
                    );
                    self.state = DwellState::Idle;
                }
            }
        }
    }

    /// Entry condition: the average distance from the three path points
    /// preceding the current sample is within the dwell radius.
    fn holds_still(&self, sample: &SmoothedSample, path: &[PathPoint]) -> bool {
        let prior = &path[..path.len().saturating_sub(1)];
        if prior.len() < 3 {
            return false;
        }
        let avg: f64 = prior[prior.len() - 3..]
            .iter()
            .map(|p| haversine_distance(p.lat, p.lon, sample.lat, sample.lon))
            .sum::<f64>()
            / 3.0;
        avg <= self.radius_meters
    }

    /// Create or reuse a hesitation event for a confirmed dwell.
    /// Reuse rule: first event in list order whose anchor is within the
    /// radius of the candidate anchor.
    fn materialize(
        &self,
        anchor_lat: f64,
        anchor_lon: f64,
        anchor_time: DateTime<Utc>,
        now: DateTime<Utc>,
        events: &mut Vec<HesitationEvent>,
        next_id: &mut dyn FnMut() -> String,
    ) -> usize {
        if let Some(index) = events.iter().position(|e| {
            haversine_distance(e.anchor_lat, e.anchor_lon, anchor_lat, anchor_lon)
                <= self.radius_meters
        }) {
            let event = &mut events[index];
            event.end_time = now;
            event.duration_seconds = (now - event.start_time).num_seconds();
            return index;
        }

        events.push(HesitationEvent {
            id: next_id(),
            anchor_lat,
            anchor_lon,
            start_time: anchor_time,
            end_time: now,
            duration_seconds: (now - anchor_time).num_seconds(),
        });
        events.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ~1 m of latitude in degrees.
    const LAT_METER: f64 = 1.0 / 111_320.0;

    struct Harness {
        detector: DwellDetector,
        path: Vec<PathPoint>,
        events: Vec<HesitationEvent>,
        id_counter: u32,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                detector: DwellDetector::new(&EngineConfig::default()),
                path: Vec::new(),
                events: Vec::new(),
                id_counter: 0,
            }
        }

        fn feed(&mut self, lat: f64, lon: f64, secs: i64) {
            let sample = SmoothedSample {
                lat,
                lon,
                altitude: 0.0,
                horizontal_accuracy: 10.0,
                vertical_accuracy: 10.0,
                timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            };
            self.path.push(PathPoint::from(&sample));
            let counter = &mut self.id_counter;
            self.detector.observe(
                &sample,
                &self.path,
                &mut self.events,
                &mut || {
                    *counter += 1;
                    format!("hes_{}", counter)
                },
            );
        }
    }

    #[test]
    fn test_clustered_stream_yields_single_event() {
        let mut h = Harness::new();
        // 20 samples within ~5 m of a point, 1 s apart.
        for i in 0..20i64 {
            let jitter = (i % 3) as f64 * 2.0 * LAT_METER;
            h.feed(48.2 + jitter, 16.37, i);
        }
        assert_eq!(h.events.len(), 1);
        assert!(h.events[0].duration_seconds >= 15);
    }

    #[test]
    fn test_moving_stream_yields_no_events() {
        let mut h = Harness::new();
        // >10 m every 2 samples: 12 m steps each sample.
        for i in 0..30i64 {
            h.feed(48.2 + 12.0 * LAT_METER * i as f64, 16.37, i);
        }
        assert!(h.events.is_empty());
    }

    #[test]
    fn test_sub_threshold_dwell_is_discarded() {
        let mut h = Harness::new();
        // Still for 10 s (below the 15 s threshold), then walk off.
        for i in 0..10i64 {
            h.feed(48.2, 16.37, i);
        }
        for i in 10..30i64 {
            h.feed(48.2 + 15.0 * LAT_METER * (i - 9) as f64, 16.37, i);
        }
        assert!(h.events.is_empty());
    }

    #[test]
    fn test_event_extends_then_locks_on_exit() {
        let mut h = Harness::new();
        for i in 0..25i64 {
            h.feed(48.2, 16.37, i);
        }
        assert_eq!(h.events.len(), 1);
        let extended = h.events[0].duration_seconds;
        assert!(extended >= 20);

        // First sample beyond the radius closes the event.
        h.feed(48.2 + 20.0 * LAT_METER, 16.37, 25);
        let locked = h.events[0].duration_seconds;
        assert_eq!(locked, extended);

        // Further movement does not touch it.
        for i in 26..30i64 {
            h.feed(48.2 + 20.0 * LAT_METER * (i - 24) as f64, 16.37, i);
        }
        assert_eq!(h.events[0].duration_seconds, locked);
    }

    #[test]
    fn test_returning_dwell_reuses_first_matching_event() {
        let mut h = Harness::new();
        // First dwell at A.
        for i in 0..20i64 {
            h.feed(48.2, 16.37, i);
        }
        assert_eq!(h.events.len(), 1);

        // Walk 50 m away and back.
        for i in 20..26i64 {
            h.feed(48.2 + 12.0 * LAT_METER * (i - 19) as f64, 16.37, i);
        }
        for i in 26..32i64 {
            h.feed(48.2 + 12.0 * LAT_METER * (31 - i) as f64, 16.37, i);
        }

        // Second dwell within 10 m of A: absorbed by the first event
        // (first-list-match), not a new one.
        for i in 32..52i64 {
            h.feed(48.2, 16.37, i);
        }
        assert_eq!(h.events.len(), 1);
        assert!(h.events[0].duration_seconds > 40);
    }

    #[test]
    fn test_distinct_locations_create_distinct_events() {
        let mut h = Harness::new();
        for i in 0..20i64 {
            h.feed(48.2, 16.37, i);
        }
        // Move 100 m north, then dwell again.
        for i in 20..28i64 {
            h.feed(48.2 + 12.5 * LAT_METER * (i - 19) as f64, 16.37, i);
        }
        for i in 28..50i64 {
            h.feed(48.2 + 100.0 * LAT_METER, 16.37, i);
        }
        assert_eq!(h.events.len(), 2);
    }
}
