//! Engine configuration.
//!
//! Defaults match the product tuning: 50-unit accuracy gate, 5-sample
//! smoothing window, 10 m / 15 s dwell detection, 5 s persistence cadence.

use std::time::Duration;

use crate::types::UnitSystem;

/// Tuning knobs for one tracking session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Samples with horizontal accuracy at or above this are dropped.
    pub accuracy_threshold: f64,
    /// Sliding window length for position smoothing.
    pub smoothing_window: usize,
    /// Radius in meters within which a dwell anchor holds.
    pub dwell_radius_meters: f64,
    /// Minimum dwell duration before a hesitation event materializes.
    pub dwell_min_seconds: i64,
    /// Wall-clock duration tick (UI-facing, must never block).
    pub duration_tick: Duration,
    /// Periodic persistence cadence while active.
    pub persist_interval: Duration,
    /// Every Nth accepted sample may trigger a place-name lookup.
    pub geocode_sample_stride: u64,
    /// Minimum spacing between place-name lookups.
    pub geocode_min_interval: Duration,
    /// Reverse-geocode endpoint; `None` disables lookups entirely.
    pub geocode_endpoint: Option<String>,
    /// Unit preference, applied only when formatting.
    pub units: UnitSystem,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold: 50.0,
            smoothing_window: 5,
            dwell_radius_meters: 10.0,
            dwell_min_seconds: 15,
            duration_tick: Duration::from_secs(1),
            persist_interval: Duration::from_secs(5),
            geocode_sample_stride: 5,
            geocode_min_interval: Duration::from_secs(10),
            geocode_endpoint: None,
            units: UnitSystem::Metric,
        }
    }
}
