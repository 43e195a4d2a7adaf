//! journeyrs - journey tracking engine for guided exposure walks.
//!
//! This crate is the core of the journey feature: it ingests a live stream
//! of noisy position samples and turns it into a clean path, incremental
//! distance/duration/pace metrics, detected hesitation events, emotion
//! checkpoints correlated to position, and a derived safe-area sub-path,
//! all persisted locally and flagged for a separate sync service.
//!
//! It is an embedded library component: there is no CLI, no rendering and
//! no transport layer here. The host app feeds [`RawSample`]s and feeling
//! reports into a [`JourneySession`] and renders the [`LiveStatus`]
//! projection it publishes.

pub mod checkpoints;
pub mod config;
pub mod dwell;
pub mod error;
pub mod filter;
pub mod geo_utils;
pub mod geocode;
pub mod metrics;
mod migrations;
pub mod safe_area;
pub mod session;
pub mod status;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use geocode::{PlaceNameProvider, ReverseGeocoder};
pub use session::JourneySession;
pub use status::LiveStatus;
pub use store::JourneyStore;
pub use types::{
    Checkpoint, FeelingLevel, HesitationEvent, Journey, JourneyPhase, JourneySummary,
    LocationAuthorization, PathPoint, RawSample, SafeAreaPoint, SmoothedSample, SyncState,
    UnitSystem,
};

/// Initialize logging on Android. The host app calls this once at startup.
#[cfg(target_os = "android")]
pub fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("journeyrs"),
    );
}

/// No-op on non-Android platforms; the host environment owns logging.
#[cfg(not(target_os = "android"))]
pub fn init_logging() {}
