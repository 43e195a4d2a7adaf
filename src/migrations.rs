//! Versioned schema migrations.
//!
//! The schema version lives in `PRAGMA user_version`; each step is an
//! explicit function applied exactly once. New databases run every step
//! in order, so the baseline is itself migration v1.

use log::info;
use rusqlite::{Connection, Result};

/// Bring a database up to the current schema version.
pub fn run(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < 1 {
        migrate_v1_baseline(conn)?;
    }
    if version < 2 {
        migrate_v2_place_name(conn)?;
    }

    Ok(())
}

/// v1: baseline schema.
fn migrate_v1_baseline(conn: &Connection) -> Result<()> {
    info!("[JourneyStore] running migration v1: baseline schema");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS journeys (
            id TEXT PRIMARY KEY,
            start_time INTEGER NOT NULL,
            end_time INTEGER,
            distance_meters REAL NOT NULL DEFAULT 0,
            duration_seconds INTEGER NOT NULL DEFAULT 0,
            phase TEXT NOT NULL CHECK(phase IN ('created', 'active', 'finalized')),
            is_completed INTEGER NOT NULL DEFAULT 0,
            is_synced INTEGER NOT NULL DEFAULT 0,
            needs_sync INTEGER NOT NULL DEFAULT 1,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            last_synced_at INTEGER,
            updated_at INTEGER NOT NULL
        );

        -- Path stored as one packed blob per journey (overwritten whole).
        CREATE TABLE IF NOT EXISTS journey_paths (
            journey_id TEXT PRIMARY KEY,
            points BLOB NOT NULL,
            point_count INTEGER NOT NULL,
            FOREIGN KEY (journey_id) REFERENCES journeys(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS checkpoints (
            id TEXT PRIMARY KEY,
            journey_id TEXT NOT NULL,
            lat REAL NOT NULL,
            lon REAL NOT NULL,
            feeling INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            FOREIGN KEY (journey_id) REFERENCES journeys(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS hesitations (
            id TEXT PRIMARY KEY,
            journey_id TEXT NOT NULL,
            anchor_lat REAL NOT NULL,
            anchor_lon REAL NOT NULL,
            start_time INTEGER NOT NULL,
            end_time INTEGER NOT NULL,
            duration_seconds INTEGER NOT NULL,
            FOREIGN KEY (journey_id) REFERENCES journeys(id) ON DELETE CASCADE
        );

        -- Derived rows, wholesale-replaced each persistence cycle.
        CREATE TABLE IF NOT EXISTS safe_area_points (
            journey_id TEXT NOT NULL,
            lat REAL NOT NULL,
            lon REAL NOT NULL,
            timestamp INTEGER NOT NULL,
            FOREIGN KEY (journey_id) REFERENCES journeys(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_checkpoints_journey ON checkpoints(journey_id);
        CREATE INDEX IF NOT EXISTS idx_hesitations_journey ON hesitations(journey_id);
        CREATE INDEX IF NOT EXISTS idx_safe_area_journey ON safe_area_points(journey_id);
        CREATE INDEX IF NOT EXISTS idx_journeys_needs_sync ON journeys(needs_sync);

        PRAGMA user_version = 1;
        "#,
    )?;

    info!("[JourneyStore] migration v1 complete");
    Ok(())
}

/// v2: best-effort place name on the journey record.
fn migrate_v2_place_name(conn: &Connection) -> Result<()> {
    info!("[JourneyStore] running migration v2: add place_name");

    // Guard for databases created before versioning was introduced.
    let column_exists: i64 = conn
        .prepare("SELECT COUNT(*) FROM pragma_table_info('journeys') WHERE name = 'place_name'")?
        .query_row([], |row| row.get(0))?;

    if column_exists == 0 {
        conn.execute("ALTER TABLE journeys ADD COLUMN place_name TEXT", [])?;
    }
    conn.execute_batch("PRAGMA user_version = 2;")?;

    info!("[JourneyStore] migration v2 complete");
    Ok(())
}
