//! Sample filter: accuracy gating and sliding-window smoothing.
//!
//! Low-quality samples are dropped silently; this only affects path density,
//! never correctness, so rejection is not an error. Accepted samples are
//! smoothed with a recency-weighted average over the last few accepted
//! samples before they reach the rest of the pipeline.

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::types::{RawSample, SmoothedSample};

/// Result of pushing a raw sample through the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accepted {
    pub sample: SmoothedSample,
    /// Set on every Nth accepted sample; the session may use it to trigger a
    /// best-effort place-name lookup. Never blocks the pipeline.
    pub geocode_hint: bool,
}

/// Accuracy gate plus sliding-window smoother.
#[derive(Debug)]
pub struct SampleFilter {
    window: VecDeque<RawSample>,
    window_len: usize,
    accuracy_threshold: f64,
    geocode_stride: u64,
    accepted_count: u64,
}

impl SampleFilter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.smoothing_window),
            window_len: config.smoothing_window.max(1),
            accuracy_threshold: config.accuracy_threshold,
            geocode_stride: config.geocode_sample_stride.max(1),
            accepted_count: 0,
        }
    }

    /// Push a raw sample. Returns `None` when the sample is rejected for
    /// low accuracy, otherwise the smoothed sample.
    pub fn ingest(&mut self, raw: RawSample) -> Option<Accepted> {
        if raw.horizontal_accuracy >= self.accuracy_threshold {
            log::debug!(
                "[SampleFilter] dropped sample with horizontal accuracy {:.1}",
                raw.horizontal_accuracy
            );
            return None;
        }

        if self.window.len() == self.window_len {
            self.window.pop_front();
        }
        self.window.push_back(raw);
        self.accepted_count += 1;

        let sample = if self.window.len() < 2 {
            // Not enough history to smooth; pass through unchanged.
            SmoothedSample {
                lat: raw.lat,
                lon: raw.lon,
                altitude: raw.altitude,
                horizontal_accuracy: raw.horizontal_accuracy,
                vertical_accuracy: raw.vertical_accuracy,
                timestamp: raw.timestamp,
            }
        } else {
            self.smoothed(raw)
        };

        Some(Accepted {
            sample,
            geocode_hint: self.accepted_count % self.geocode_stride == 0,
        })
    }

    /// Recency-weighted average over the window: weight(i) = i + 1 with the
    /// window ordered oldest to newest. Accuracies use an unweighted mean.
    fn smoothed(&self, raw: RawSample) -> SmoothedSample {
        let n = self.window.len() as f64;
        let mut weight_sum = 0.0;
        let mut lat = 0.0;
        let mut lon = 0.0;
        let mut altitude = 0.0;
        let mut h_acc = 0.0;
        let mut v_acc = 0.0;

        for (i, s) in self.window.iter().enumerate() {
            let w = (i + 1) as f64;
            weight_sum += w;
            lat += s.lat * w;
            lon += s.lon * w;
            altitude += s.altitude * w;
            h_acc += s.horizontal_accuracy;
            v_acc += s.vertical_accuracy;
        }

        SmoothedSample {
            lat: lat / weight_sum,
            lon: lon / weight_sum,
            altitude: altitude / weight_sum,
            horizontal_accuracy: h_acc / n,
            vertical_accuracy: v_acc / n,
            timestamp: raw.timestamp,
        }
    }
}
