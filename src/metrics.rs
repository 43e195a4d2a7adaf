//! Distance, duration and pace accumulation, plus display formatting.
//!
//! Distance is sample-driven: each smoothed sample adds the geodesic
//! distance to its predecessor. Duration is tick-driven so the display
//! keeps advancing through signal gaps. Pace stays an explicit `None`
//! until any distance is covered; formatting (and the metric/imperial
//! preference) lives at the edge, never in the accumulation.

use crate::geo_utils::haversine_distance;
use crate::types::{SmoothedSample, UnitSystem};

const METERS_PER_MILE: f64 = 1609.344;

/// Running distance/duration accumulator for one session.
#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    distance_meters: f64,
    duration_seconds: u32,
    last_position: Option<(f64, f64)>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a smoothed sample; returns the segment distance it added.
    /// The first sample contributes zero.
    pub fn observe(&mut self, sample: &SmoothedSample) -> f64 {
        let segment = match self.last_position {
            Some((lat, lon)) => haversine_distance(lat, lon, sample.lat, sample.lon),
            None => 0.0,
        };
        self.distance_meters += segment;
        self.last_position = Some((sample.lat, sample.lon));
        segment
    }

    /// Advance elapsed time by one second (wall-clock tick, not sample-driven).
    pub fn tick_second(&mut self) {
        self.duration_seconds += 1;
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    /// Pace in minutes per preferred distance unit (km or mile).
    /// `None` until any distance has been covered; never a division error.
    pub fn pace_minutes(&self, units: UnitSystem) -> Option<f64> {
        pace_minutes(self.duration_seconds, self.distance_meters, units)
    }
}

/// Pace in minutes per km/mile, or `None` for zero distance.
pub fn pace_minutes(duration_seconds: u32, distance_meters: f64, units: UnitSystem) -> Option<f64> {
    if distance_meters <= 0.0 {
        return None;
    }
    let elapsed_minutes = f64::from(duration_seconds) / 60.0;
    let distance_units = match units {
        UnitSystem::Metric => distance_meters / 1000.0,
        UnitSystem::Imperial => distance_meters / METERS_PER_MILE,
    };
    Some(elapsed_minutes / distance_units)
}

// ============================================================================
// Formatting
// ============================================================================

/// "MM:SS", or "H:MM:SS" from one hour up.
pub fn format_duration(seconds: u32) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Distance for display: meters below 1 km, otherwise km; miles for imperial.
pub fn format_distance(meters: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => {
            if meters < 1000.0 {
                format!("{:.0} m", meters)
            } else {
                format!("{:.2} km", meters / 1000.0)
            }
        }
        UnitSystem::Imperial => format!("{:.2} mi", meters / METERS_PER_MILE),
    }
}

/// Pace for display, with an explicit placeholder while pace is undefined.
pub fn format_pace(pace_minutes: Option<f64>, units: UnitSystem) -> String {
    let unit = match units {
        UnitSystem::Metric => "km",
        UnitSystem::Imperial => "mi",
    };
    match pace_minutes {
        Some(p) if p.is_finite() => {
            let total_seconds = (p * 60.0).round() as u64;
            format!("{}:{:02} /{}", total_seconds / 60, total_seconds % 60, unit)
        }
        _ => format!("--:-- /{}", unit),
    }
}
