//! Checkpoint correlation: binds a user-reported feeling to the most
//! recent smoothed position.

use chrono::{DateTime, Utc};

use crate::types::{Checkpoint, FeelingLevel, PathPoint};

/// Build a checkpoint at the latest path position.
///
/// Returns `None` when no path point exists yet; the caller treats that as
/// a silent no-op. Whether an early report should fall back to the last raw
/// location instead is an open product question (see DESIGN.md).
pub fn correlate(
    path: &[PathPoint],
    feeling: FeelingLevel,
    now: DateTime<Utc>,
    id: String,
) -> Option<Checkpoint> {
    let latest = path.last()?;
    Some(Checkpoint {
        id,
        lat: latest.lat,
        lon: latest.lon,
        feeling,
        timestamp: now,
    })
}
