//! Tracking session: single-writer state, periodic ticks, persistence
//! hand-off and the stop sequence.
//!
//! One session exists per active journey. All state mutation happens inside
//! one tokio task fed by a command channel, so samples, feelings and ticks
//! can never interleave partial updates. Persistence runs on a dedicated
//! worker thread that receives cloned snapshots; the sample path and the
//! 1-second duration tick never wait on SQLite. Stopping performs one final
//! acknowledged write before `stop()` returns, so a caller can dismiss the
//! tracking surface without racing the save.

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::checkpoints;
use crate::config::EngineConfig;
use crate::dwell::DwellDetector;
use crate::error::{EngineError, Result};
use crate::filter::SampleFilter;
use crate::geocode::{PlaceNameProvider, ReverseGeocoder};
use crate::metrics::MetricsAccumulator;
use crate::status::LiveStatus;
use crate::store::JourneyStore;
use crate::types::{
    FeelingLevel, Journey, LocationAuthorization, PathPoint, RawSample, SmoothedSample,
};

// ============================================================================
// Core state (single writer, synchronous)
// ============================================================================

/// All mutable per-session state. Pure and synchronous; the async layer
/// only decides *when* its methods run.
pub(crate) struct SessionState {
    journey: Journey,
    filter: SampleFilter,
    metrics: MetricsAccumulator,
    dwell: DwellDetector,
    last_sample: Option<SmoothedSample>,
    hesitation_counter: u32,
    checkpoint_counter: u32,
    units: crate::types::UnitSystem,
}

impl SessionState {
    pub(crate) fn new(config: &EngineConfig) -> Self {
        let start_time = Utc::now();
        let id = format!("journey_{}", start_time.timestamp_millis());
        let mut journey = Journey::new(id, start_time);
        journey.activate();
        Self {
            journey,
            filter: SampleFilter::new(config),
            metrics: MetricsAccumulator::new(),
            dwell: DwellDetector::new(config),
            last_sample: None,
            hesitation_counter: 0,
            checkpoint_counter: 0,
            units: config.units,
        }
    }

    /// Push a raw sample through filter -> path -> accumulator -> detector.
    /// Returns the accepted smoothed sample and its geocode hint, or `None`
    /// when the sample was rejected.
    pub(crate) fn ingest(&mut self, raw: RawSample) -> Option<crate::filter::Accepted> {
        let accepted = self.filter.ingest(raw)?;
        let sample = accepted.sample;

        self.journey.path.push(PathPoint::from(&sample));
        self.metrics.observe(&sample);
        self.journey.distance_meters = self.metrics.distance_meters();

        let journey_id = self.journey.id.clone();
        let counter = &mut self.hesitation_counter;
        let mut next_id = || {
            *counter += 1;
            format!("{}_hes{}", journey_id, *counter)
        };
        self.dwell.observe(
            &sample,
            &self.journey.path,
            &mut self.journey.hesitations,
            &mut next_id,
        );

        self.last_sample = Some(sample);
        Some(accepted)
    }

    /// Bind a feeling to the latest position. Silent no-op while the path
    /// is empty.
    pub(crate) fn record_feeling(&mut self, level: FeelingLevel) {
        let id = format!("{}_cp{}", self.journey.id, self.checkpoint_counter + 1);
        match checkpoints::correlate(&self.journey.path, level, Utc::now(), id) {
            Some(cp) => {
                self.checkpoint_counter += 1;
                self.journey.checkpoints.push(cp);
            }
            None => {
                debug!("[Session] feeling {:?} ignored: no path point yet", level);
            }
        }
    }

    /// One-second wall-clock tick; advances duration through signal gaps.
    pub(crate) fn tick_second(&mut self) {
        self.metrics.tick_second();
        self.journey.duration_seconds = self.metrics.duration_seconds();
    }

    pub(crate) fn set_place_name(&mut self, name: String) {
        self.journey.place_name = Some(name);
    }

    pub(crate) fn finalize(&mut self) {
        self.journey.finalize(Utc::now());
    }

    pub(crate) fn snapshot(&self) -> Journey {
        self.journey.clone()
    }

    pub(crate) fn live_status(&self, tracking: bool) -> LiveStatus {
        LiveStatus::project(&self.journey, self.last_sample.as_ref(), self.units, tracking)
    }
}

// ============================================================================
// Persistence worker
// ============================================================================

struct PersistJob {
    snapshot: Journey,
    ack: Option<oneshot::Sender<Result<()>>>,
}

/// Handle to the store worker thread. Sends are non-blocking; the final
/// write at stop attaches an ack channel.
struct StoreHandle {
    tx: std_mpsc::Sender<PersistJob>,
}

impl StoreHandle {
    fn spawn(mut store: JourneyStore) -> Self {
        let (tx, rx) = std_mpsc::channel::<PersistJob>();
        std::thread::spawn(move || {
            while let Ok(job) = rx.recv() {
                let result = store.save_journey(&job.snapshot);
                if let Err(e) = &result {
                    // No in-loop retry; the next periodic tick writes again.
                    warn!("[JourneyStore] write failed, next tick retries: {}", e);
                }
                if let Some(ack) = job.ack {
                    let _ = ack.send(result);
                }
            }
            debug!("[JourneyStore] worker thread exiting");
        });
        Self { tx }
    }

    fn persist(&self, snapshot: Journey, ack: Option<oneshot::Sender<Result<()>>>) {
        if self.tx.send(PersistJob { snapshot, ack }).is_err() {
            warn!("[JourneyStore] worker gone; dropping persistence request");
        }
    }
}

// ============================================================================
// Session
// ============================================================================

enum Command {
    Sample(RawSample),
    Feeling(FeelingLevel),
    PlaceName(String),
    Stop(oneshot::Sender<Result<Journey>>),
}

/// Handle to one active tracking session.
///
/// Created by [`JourneySession::start`]; consumed by [`JourneySession::stop`].
/// There is no ambient global session: whoever holds this handle owns the
/// journey.
pub struct JourneySession {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<LiveStatus>,
    journey_id: String,
}

impl JourneySession {
    /// Start tracking. Must be called from within a tokio runtime.
    ///
    /// Fails fast with [`EngineError::AuthorizationDenied`] unless location
    /// access is authorized, and with a persistence error when the store
    /// cannot be opened. Writes an initial snapshot immediately.
    pub fn start(
        config: EngineConfig,
        db_path: &str,
        authorization: LocationAuthorization,
    ) -> Result<Self> {
        let provider = match &config.geocode_endpoint {
            Some(endpoint) => Some(
                Arc::new(ReverseGeocoder::new(endpoint.clone())?) as Arc<dyn PlaceNameProvider>
            ),
            None => None,
        };
        Self::start_with_provider(config, db_path, authorization, provider)
    }

    /// Like [`JourneySession::start`] with an explicit place-name provider
    /// (or none), so embedders and tests can supply their own.
    pub fn start_with_provider(
        config: EngineConfig,
        db_path: &str,
        authorization: LocationAuthorization,
        provider: Option<Arc<dyn PlaceNameProvider>>,
    ) -> Result<Self> {
        if authorization != LocationAuthorization::Authorized {
            return Err(EngineError::AuthorizationDenied);
        }

        let store = StoreHandle::spawn(JourneyStore::open(db_path)?);
        let mut state = SessionState::new(&config);
        let journey_id = state.journey.id.clone();
        info!("[Session] starting journey {}", journey_id);

        // Write once at start so the journey exists durably from second zero.
        store.persist(state.snapshot(), None);

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
        let (status_tx, status_rx) = watch::channel(state.live_status(true));
        let internal_tx = cmd_tx.clone();

        tokio::spawn(async move {
            let mut duration_tick = tokio::time::interval(config.duration_tick);
            let mut persist_tick = tokio::time::interval(config.persist_interval);
            duration_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            persist_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Both intervals fire immediately on first poll; consume that.
            duration_tick.tick().await;
            persist_tick.tick().await;

            let mut last_geocode: Option<Instant> = None;

            loop {
                tokio::select! {
                    command = cmd_rx.recv() => match command {
                        Some(Command::Sample(raw)) => {
                            if let Some(accepted) = state.ingest(raw) {
                                if accepted.geocode_hint {
                                    Self::maybe_geocode(
                                        &provider,
                                        &internal_tx,
                                        &mut last_geocode,
                                        config.geocode_min_interval,
                                        accepted.sample.lat,
                                        accepted.sample.lon,
                                    );
                                }
                            }
                        }
                        Some(Command::Feeling(level)) => state.record_feeling(level),
                        Some(Command::PlaceName(name)) => state.set_place_name(name),
                        Some(Command::Stop(reply)) => {
                            // Stop sequence: close intake, cancel ticks (loop
                            // exit), one final acknowledged write, finalize.
                            cmd_rx.close();
                            let journey = Self::shutdown(&mut state, &store).await;
                            let _ = status_tx.send(state.live_status(false));
                            let _ = reply.send(Ok(journey));
                            break;
                        }
                        None => {
                            // Handle dropped without an explicit stop; still
                            // finalize and flush so nothing is lost.
                            warn!("[Session] handle dropped; finalizing journey");
                            Self::shutdown(&mut state, &store).await;
                            let _ = status_tx.send(state.live_status(false));
                            break;
                        }
                    },
                    _ = duration_tick.tick() => {
                        state.tick_second();
                        let _ = status_tx.send(state.live_status(true));
                    }
                    _ = persist_tick.tick() => {
                        store.persist(state.snapshot(), None);
                    }
                }
            }
        });

        Ok(Self {
            commands: cmd_tx,
            status: status_rx,
            journey_id,
        })
    }

    /// Finalize the journey and flush it with an acknowledged write.
    /// Finalization sticks even when the write fails; needs_sync stays set
    /// so the next sync pass catches up.
    async fn shutdown(state: &mut SessionState, store: &StoreHandle) -> Journey {
        state.finalize();
        let (ack_tx, ack_rx) = oneshot::channel();
        store.persist(state.snapshot(), Some(ack_tx));
        match ack_rx.await {
            Ok(Ok(())) => {
                info!("[Session] journey {} finalized and persisted", state.journey.id);
            }
            Ok(Err(e)) => {
                warn!(
                    "[Session] final write for {} failed ({}); journey left needing sync",
                    state.journey.id, e
                );
            }
            Err(_) => {
                warn!("[Session] store worker gone during final write");
            }
        }
        state.snapshot()
    }

    fn maybe_geocode(
        provider: &Option<Arc<dyn PlaceNameProvider>>,
        internal_tx: &mpsc::Sender<Command>,
        last_geocode: &mut Option<Instant>,
        min_interval: std::time::Duration,
        lat: f64,
        lon: f64,
    ) {
        let Some(provider) = provider else {
            return;
        };
        let due = last_geocode.map_or(true, |t| t.elapsed() >= min_interval);
        if !due {
            return;
        }
        *last_geocode = Some(Instant::now());

        let lookup = provider.resolve(lat, lon);
        let tx = internal_tx.clone();
        tokio::spawn(async move {
            if let Some(name) = lookup.await {
                // Session may have stopped meanwhile; that is fine.
                let _ = tx.try_send(Command::PlaceName(name));
            }
        });
    }

    /// Id of the journey this session owns.
    pub fn journey_id(&self) -> &str {
        &self.journey_id
    }

    /// Submit a raw location sample. Non-blocking; returns an error only
    /// when the session is no longer active. A momentarily full queue drops
    /// the sample, which only affects path density.
    pub fn submit_sample(&self, sample: RawSample) -> Result<()> {
        match self.commands.try_send(Command::Sample(sample)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("[Session] sample queue full; sample dropped");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EngineError::SessionNotActive),
        }
    }

    /// Record an emotional checkpoint at the current position.
    pub fn record_feeling(&self, level: FeelingLevel) -> Result<()> {
        self.commands
            .try_send(Command::Feeling(level))
            .map_err(|_| EngineError::SessionNotActive)
    }

    /// Watch the once-per-second live status projection.
    pub fn status(&self) -> watch::Receiver<LiveStatus> {
        self.status.clone()
    }

    /// Stop tracking. Returns only after the final persistence write has
    /// been attempted, so the stored record is queryable immediately.
    pub async fn stop(self) -> Result<Journey> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Stop(reply_tx))
            .await
            .map_err(|_| EngineError::SessionNotActive)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}
