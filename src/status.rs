//! Live status projection for the UI and the external live-activity surface.
//!
//! A read-only snapshot of the current metrics, refreshed once per second
//! while tracking. Carries both formatted strings (ready to render) and the
//! raw numeric values for surfaces that format themselves.

use serde::Serialize;

use crate::metrics;
use crate::types::{Checkpoint, HesitationEvent, Journey, SmoothedSample, UnitSystem};

/// Point-in-time projection of an active (or just-finished) session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    pub tracking: bool,
    pub duration_text: String,
    pub distance_text: String,
    pub pace_text: String,
    pub duration_seconds: u32,
    pub distance_meters: f64,
    /// Minutes per preferred unit; `None` while no distance is covered.
    pub pace_minutes: Option<f64>,
    pub last_lat: Option<f64>,
    pub last_lon: Option<f64>,
    pub altitude: Option<f64>,
    pub place_name: Option<String>,
    pub checkpoints: Vec<Checkpoint>,
    pub hesitations: Vec<HesitationEvent>,
}

impl LiveStatus {
    /// Project a journey snapshot into a displayable status.
    pub(crate) fn project(
        journey: &Journey,
        last_sample: Option<&SmoothedSample>,
        units: UnitSystem,
        tracking: bool,
    ) -> Self {
        let pace = metrics::pace_minutes(journey.duration_seconds, journey.distance_meters, units);
        Self {
            tracking,
            duration_text: metrics::format_duration(journey.duration_seconds),
            distance_text: metrics::format_distance(journey.distance_meters, units),
            pace_text: metrics::format_pace(pace, units),
            duration_seconds: journey.duration_seconds,
            distance_meters: journey.distance_meters,
            pace_minutes: pace,
            last_lat: last_sample.map(|s| s.lat),
            last_lon: last_sample.map(|s| s.lon),
            altitude: last_sample.map(|s| s.altitude),
            place_name: journey.place_name.clone(),
            checkpoints: journey.checkpoints.clone(),
            hesitations: journey.hesitations.clone(),
        }
    }
}
