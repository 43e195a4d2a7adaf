//! SQLite journey store.
//!
//! Durable local storage keyed by journey id, local-first: every write
//! flags the record as needing sync and a separate (out-of-scope) sync
//! service later flips it back. Writes fully overwrite the embedded
//! collections from the in-memory snapshot inside one transaction; nothing
//! is incrementally diffed. Deletion is a tombstone only.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{EngineError, Result};
use crate::migrations;
use crate::safe_area;
use crate::types::{
    Checkpoint, FeelingLevel, HesitationEvent, Journey, JourneyPhase, JourneySummary, PathPoint,
    SafeAreaPoint, SyncState,
};

fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Journey persistence coordinator.
pub struct JourneyStore {
    conn: Connection,
}

impl JourneyStore {
    /// Open (or create) a store at the given path and run migrations.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run(&conn)?;
        Ok(Self { conn })
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Persist a journey snapshot.
    ///
    /// Overwrites the path blob, checkpoints and hesitations wholesale,
    /// recomputes and replaces the derived safe-area rows, and marks the
    /// record as needing sync with a fresh `updated_at`.
    pub fn save_journey(&mut self, journey: &Journey) -> Result<()> {
        let now = to_millis(Utc::now());
        let path_blob =
            rmp_serde::to_vec(&journey.path).map_err(|e| EngineError::Encoding(e.to_string()))?;
        let safe_points = safe_area::segment(journey);

        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO journeys (
                id, start_time, end_time, distance_meters, duration_seconds,
                phase, is_completed, place_name,
                is_synced, needs_sync, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 1, ?9)
            ON CONFLICT(id) DO UPDATE SET
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                distance_meters = excluded.distance_meters,
                duration_seconds = excluded.duration_seconds,
                phase = excluded.phase,
                is_completed = excluded.is_completed,
                place_name = excluded.place_name,
                is_synced = 0,
                needs_sync = 1,
                updated_at = excluded.updated_at
            "#,
            params![
                journey.id,
                to_millis(journey.start_time),
                journey.end_time.map(to_millis),
                journey.distance_meters,
                journey.duration_seconds,
                journey.phase.as_str(),
                journey.is_completed() as i64,
                journey.place_name,
                now,
            ],
        )?;

        tx.execute(
            r#"
            INSERT INTO journey_paths (journey_id, points, point_count)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(journey_id) DO UPDATE SET
                points = excluded.points,
                point_count = excluded.point_count
            "#,
            params![journey.id, path_blob, journey.path.len() as i64],
        )?;

        tx.execute(
            "DELETE FROM checkpoints WHERE journey_id = ?1",
            params![journey.id],
        )?;
        for cp in &journey.checkpoints {
            tx.execute(
                "INSERT INTO checkpoints (id, journey_id, lat, lon, feeling, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    cp.id,
                    journey.id,
                    cp.lat,
                    cp.lon,
                    cp.feeling.as_int(),
                    to_millis(cp.timestamp),
                ],
            )?;
        }

        tx.execute(
            "DELETE FROM hesitations WHERE journey_id = ?1",
            params![journey.id],
        )?;
        for h in &journey.hesitations {
            tx.execute(
                "INSERT INTO hesitations
                     (id, journey_id, anchor_lat, anchor_lon, start_time, end_time, duration_seconds)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    h.id,
                    journey.id,
                    h.anchor_lat,
                    h.anchor_lon,
                    to_millis(h.start_time),
                    to_millis(h.end_time),
                    h.duration_seconds,
                ],
            )?;
        }

        // Derived safe area: delete-then-reinsert keyed by journey id.
        tx.execute(
            "DELETE FROM safe_area_points WHERE journey_id = ?1",
            params![journey.id],
        )?;
        for p in &safe_points {
            tx.execute(
                "INSERT INTO safe_area_points (journey_id, lat, lon, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![journey.id, p.lat, p.lon, to_millis(p.timestamp)],
            )?;
        }

        tx.commit()?;

        log::debug!(
            "[JourneyStore] saved {}: {} path points, {} checkpoints, {} hesitations, {} safe-area points",
            journey.id,
            journey.path.len(),
            journey.checkpoints.len(),
            journey.hesitations.len(),
            safe_points.len()
        );
        Ok(())
    }

    /// Tombstone a journey. Physical deletion is an external retention
    /// concern.
    pub fn delete_journey(&self, id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE journeys
             SET is_deleted = 1, needs_sync = 1, is_synced = 0, updated_at = ?2
             WHERE id = ?1",
            params![id, to_millis(Utc::now())],
        )?;
        Ok(())
    }

    /// Record a successful upload by the external sync service.
    pub fn mark_synced(&self, id: &str, synced_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE journeys
             SET is_synced = 1, needs_sync = 0, last_synced_at = ?2
             WHERE id = ?1",
            params![id, to_millis(synced_at)],
        )?;
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Load a full journey by id, including its embedded collections.
    pub fn load_journey(&self, id: &str) -> Result<Option<Journey>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT start_time, end_time, distance_meters, duration_seconds,
                       phase, place_name,
                       is_synced, needs_sync, is_deleted, last_synced_at, updated_at
                FROM journeys WHERE id = ?1
                "#,
                params![id],
                |row| {
                    let phase: String = row.get(4)?;
                    Ok(Journey {
                        id: id.to_string(),
                        start_time: from_millis(row.get(0)?),
                        end_time: row.get::<_, Option<i64>>(1)?.map(from_millis),
                        distance_meters: row.get(2)?,
                        duration_seconds: row.get(3)?,
                        path: Vec::new(),
                        checkpoints: Vec::new(),
                        hesitations: Vec::new(),
                        phase: JourneyPhase::from_str(&phase).unwrap_or(JourneyPhase::Finalized),
                        place_name: row.get(5)?,
                        sync: SyncState {
                            is_synced: row.get::<_, i64>(6)? != 0,
                            needs_sync: row.get::<_, i64>(7)? != 0,
                            is_deleted: row.get::<_, i64>(8)? != 0,
                            last_synced_at: row.get::<_, Option<i64>>(9)?.map(from_millis),
                            updated_at: from_millis(row.get(10)?),
                        },
                    })
                },
            )
            .optional()?;

        let Some(mut journey) = row else {
            return Ok(None);
        };

        journey.path = self.load_path(id)?;
        journey.checkpoints = self.load_checkpoints(id)?;
        journey.hesitations = self.load_hesitations(id)?;
        Ok(Some(journey))
    }

    fn load_path(&self, id: &str) -> Result<Vec<PathPoint>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT points FROM journey_paths WHERE journey_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match blob {
            Some(bytes) => {
                rmp_serde::from_slice(&bytes).map_err(|e| EngineError::Encoding(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    fn load_checkpoints(&self, id: &str) -> Result<Vec<Checkpoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, lat, lon, feeling, timestamp
             FROM checkpoints WHERE journey_id = ?1 ORDER BY timestamp",
        )?;
        let rows = stmt
            .query_map(params![id], |row| {
                let feeling: i64 = row.get(3)?;
                Ok(Checkpoint {
                    id: row.get(0)?,
                    lat: row.get(1)?,
                    lon: row.get(2)?,
                    feeling: FeelingLevel::from_int(feeling).unwrap_or(FeelingLevel::Okay),
                    timestamp: from_millis(row.get(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn load_hesitations(&self, id: &str) -> Result<Vec<HesitationEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, anchor_lat, anchor_lon, start_time, end_time, duration_seconds
             FROM hesitations WHERE journey_id = ?1 ORDER BY start_time",
        )?;
        let rows = stmt
            .query_map(params![id], |row| {
                Ok(HesitationEvent {
                    id: row.get(0)?,
                    anchor_lat: row.get(1)?,
                    anchor_lon: row.get(2)?,
                    start_time: from_millis(row.get(3)?),
                    end_time: from_millis(row.get(4)?),
                    duration_seconds: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Derived safe-area rows for a journey, oldest first.
    pub fn safe_area_points(&self, id: &str) -> Result<Vec<SafeAreaPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT lat, lon, timestamp
             FROM safe_area_points WHERE journey_id = ?1 ORDER BY timestamp",
        )?;
        let rows = stmt
            .query_map(params![id], |row| {
                Ok(SafeAreaPoint {
                    lat: row.get(0)?,
                    lon: row.get(1)?,
                    timestamp: from_millis(row.get(2)?),
                    journey_id: id.to_string(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Lightweight rows for the history list, newest first. Tombstoned
    /// journeys are hidden.
    pub fn journey_summaries(&self) -> Result<Vec<JourneySummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT j.id, j.start_time, j.end_time, j.distance_meters, j.duration_seconds,
                   (SELECT COUNT(*) FROM checkpoints c WHERE c.journey_id = j.id),
                   (SELECT COUNT(*) FROM hesitations h WHERE h.journey_id = j.id),
                   j.place_name, j.is_completed, j.needs_sync
            FROM journeys j
            WHERE j.is_deleted = 0
            ORDER BY j.start_time DESC
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(JourneySummary {
                    id: row.get(0)?,
                    start_time: from_millis(row.get(1)?),
                    end_time: row.get::<_, Option<i64>>(2)?.map(from_millis),
                    distance_meters: row.get(3)?,
                    duration_seconds: row.get(4)?,
                    checkpoint_count: row.get(5)?,
                    hesitation_count: row.get(6)?,
                    place_name: row.get(7)?,
                    is_completed: row.get::<_, i64>(8)? != 0,
                    needs_sync: row.get::<_, i64>(9)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Ids of journeys (including tombstones) with unpushed changes, for the
    /// external sync service.
    pub fn journeys_needing_sync(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM journeys WHERE needs_sync = 1 ORDER BY updated_at")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
