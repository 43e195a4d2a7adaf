//! Core data types for the journey tracking engine.
//!
//! These types are shared between the live session, the persistence layer
//! and the UI-facing status projection. Persisted/UI-facing records use
//! camelCase serde naming so the app layer can consume them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Samples
// ============================================================================

/// A single raw position sample from the OS location service.
///
/// Transient input; never persisted. Accuracy values are unit-agnostic
/// radii (lower is better), matching what platform location APIs report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub lat: f64,
    pub lon: f64,
    /// Altitude in meters.
    pub altitude: f64,
    pub horizontal_accuracy: f64,
    pub vertical_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

/// A sample after accuracy gating and window smoothing.
///
/// Same shape as [`RawSample`]; the coordinate and altitude are weighted
/// averages over the smoothing window, the accuracies an arithmetic mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedSample {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    pub horizontal_accuracy: f64,
    pub vertical_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

/// A point on a journey's recorded path.
///
/// Append-only while a session is active; timestamps are non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&SmoothedSample> for PathPoint {
    fn from(s: &SmoothedSample) -> Self {
        Self {
            lat: s.lat,
            lon: s.lon,
            timestamp: s.timestamp,
        }
    }
}

// ============================================================================
// Checkpoints & hesitations
// ============================================================================

/// User-reported emotional level, ordered from calm to distressed.
///
/// Persisted as integers 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeelingLevel {
    Great = 1,
    Good = 2,
    Okay = 3,
    Anxious = 4,
    Panic = 5,
}

impl FeelingLevel {
    pub fn as_int(self) -> i64 {
        self as i64
    }

    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            1 => Some(FeelingLevel::Great),
            2 => Some(FeelingLevel::Good),
            3 => Some(FeelingLevel::Okay),
            4 => Some(FeelingLevel::Anxious),
            5 => Some(FeelingLevel::Panic),
            _ => None,
        }
    }

    /// Levels that mark the onset of distress for safe-area segmentation.
    pub fn is_distress(self) -> bool {
        matches!(self, FeelingLevel::Anxious | FeelingLevel::Panic)
    }
}

/// An emotional self-report bound to a moment and location during tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub feeling: FeelingLevel,
    pub timestamp: DateTime<Utc>,
}

/// A detected dwell: the user stayed within a small radius of an anchor
/// for at least the minimum duration.
///
/// Mutable in place while the dwell continues; immutable once closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HesitationEvent {
    pub id: String,
    pub anchor_lat: f64,
    pub anchor_lon: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
}

/// A derived safe-area point: part of the path prefix recorded before the
/// first distress checkpoint. Wholesale-replaced on each persistence cycle,
/// never hand-edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeAreaPoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
    pub journey_id: String,
}

// ============================================================================
// Journey
// ============================================================================

/// Journey lifecycle phase. Transitions Created -> Active -> Finalized
/// exactly once; Finalized is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JourneyPhase {
    Created,
    Active,
    Finalized,
}

impl JourneyPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            JourneyPhase::Created => "created",
            JourneyPhase::Active => "active",
            JourneyPhase::Finalized => "finalized",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(JourneyPhase::Created),
            "active" => Some(JourneyPhase::Active),
            "finalized" => Some(JourneyPhase::Finalized),
            _ => None,
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, JourneyPhase::Finalized)
    }
}

/// Local-first sync flags for a persisted journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub is_synced: bool,
    pub needs_sync: bool,
    /// Tombstone; physical deletion is an external retention concern.
    pub is_deleted: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SyncState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            is_synced: false,
            needs_sync: true,
            is_deleted: false,
            last_synced_at: None,
            updated_at: now,
        }
    }
}

/// A recorded walk: the aggregate owned by the engine for the lifetime of
/// one session, handed to the persistence coordinator for durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub distance_meters: f64,
    pub duration_seconds: u32,
    pub path: Vec<PathPoint>,
    pub checkpoints: Vec<Checkpoint>,
    pub hesitations: Vec<HesitationEvent>,
    pub phase: JourneyPhase,
    /// Best-effort reverse-geocoded place name for the current position.
    pub place_name: Option<String>,
    pub sync: SyncState,
}

impl Journey {
    pub fn new(id: String, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            distance_meters: 0.0,
            duration_seconds: 0,
            path: Vec::new(),
            checkpoints: Vec::new(),
            hesitations: Vec::new(),
            phase: JourneyPhase::Created,
            place_name: None,
            sync: SyncState::new(start_time),
        }
    }

    /// Created -> Active. Any other starting phase is left untouched.
    pub fn activate(&mut self) {
        match self.phase {
            JourneyPhase::Created => self.phase = JourneyPhase::Active,
            JourneyPhase::Active | JourneyPhase::Finalized => {
                log::warn!(
                    "[Journey] activate() ignored in phase {:?} for {}",
                    self.phase,
                    self.id
                );
            }
        }
    }

    /// Active -> Finalized. Terminal; repeated calls are ignored.
    pub fn finalize(&mut self, end_time: DateTime<Utc>) {
        match self.phase {
            JourneyPhase::Active => {
                self.phase = JourneyPhase::Finalized;
                self.end_time = Some(end_time);
                self.sync.needs_sync = true;
                self.sync.is_synced = false;
            }
            JourneyPhase::Created | JourneyPhase::Finalized => {
                log::warn!(
                    "[Journey] finalize() ignored in phase {:?} for {}",
                    self.phase,
                    self.id
                );
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.phase.is_completed()
    }
}

/// Lightweight journey row for list views: no path blob, no child
/// collections, just what a history screen needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySummary {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub distance_meters: f64,
    pub duration_seconds: u32,
    pub checkpoint_count: u32,
    pub hesitation_count: u32,
    pub place_name: Option<String>,
    pub is_completed: bool,
    pub needs_sync: bool,
}

// ============================================================================
// External configuration inputs
// ============================================================================

/// Unit preference, applied only at formatting time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitSystem {
    Metric,
    Imperial,
}

/// Authorization state reported by the OS location service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationAuthorization {
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_feeling_level_ordering() {
        assert!(FeelingLevel::Great < FeelingLevel::Good);
        assert!(FeelingLevel::Okay < FeelingLevel::Anxious);
        assert!(FeelingLevel::Anxious < FeelingLevel::Panic);
        assert!(!FeelingLevel::Okay.is_distress());
        assert!(FeelingLevel::Anxious.is_distress());
        assert!(FeelingLevel::Panic.is_distress());
    }

    #[test]
    fn test_feeling_level_int_roundtrip() {
        for v in 1..=5 {
            let level = FeelingLevel::from_int(v).unwrap();
            assert_eq!(level.as_int(), v);
        }
        assert!(FeelingLevel::from_int(0).is_none());
        assert!(FeelingLevel::from_int(6).is_none());
    }

    #[test]
    fn test_journey_lifecycle_exactly_once() {
        let mut journey = Journey::new("journey_1".into(), ts(0));
        assert_eq!(journey.phase, JourneyPhase::Created);
        assert!(!journey.is_completed());

        journey.activate();
        assert_eq!(journey.phase, JourneyPhase::Active);

        // Repeated activation is a no-op.
        journey.activate();
        assert_eq!(journey.phase, JourneyPhase::Active);

        journey.finalize(ts(60));
        assert_eq!(journey.phase, JourneyPhase::Finalized);
        assert_eq!(journey.end_time, Some(ts(60)));
        assert!(journey.is_completed());
        assert!(journey.sync.needs_sync);

        // Finalized is terminal.
        journey.finalize(ts(120));
        assert_eq!(journey.end_time, Some(ts(60)));
    }

    #[test]
    fn test_finalize_requires_active() {
        let mut journey = Journey::new("journey_2".into(), ts(0));
        journey.finalize(ts(10));
        assert_eq!(journey.phase, JourneyPhase::Created);
        assert!(journey.end_time.is_none());
    }

    #[test]
    fn test_phase_str_roundtrip() {
        for phase in [
            JourneyPhase::Created,
            JourneyPhase::Active,
            JourneyPhase::Finalized,
        ] {
            assert_eq!(JourneyPhase::from_str(phase.as_str()), Some(phase));
        }
        assert!(JourneyPhase::from_str("bogus").is_none());
    }
}
