//! Safe-area segmentation.
//!
//! The safe area is the path prefix recorded before the first distress
//! checkpoint: it surfaces, without manual tagging, how far the user got
//! before distress began. Runs once per persistence cycle; the result is
//! wholesale-replaced in the store, never merged.

use crate::types::{Journey, SafeAreaPoint};

/// Compute the safe-area points for a journey.
///
/// Takes the earliest checkpoint whose feeling is distress-level and keeps
/// every path point strictly before it; the whole path when no distress was
/// reported.
pub fn segment(journey: &Journey) -> Vec<SafeAreaPoint> {
    let cutoff = journey
        .checkpoints
        .iter()
        .filter(|c| c.feeling.is_distress())
        .map(|c| c.timestamp)
        .min();

    journey
        .path
        .iter()
        .filter(|p| match cutoff {
            Some(t) => p.timestamp < t,
            None => true,
        })
        .map(|p| SafeAreaPoint {
            lat: p.lat,
            lon: p.lon,
            timestamp: p.timestamp,
            journey_id: journey.id.clone(),
        })
        .collect()
}
