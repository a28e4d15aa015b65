use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS wells (
    well_id BLOB PRIMARY KEY CHECK (length(well_id) = 16),
    project_id BLOB CHECK (project_id IS NULL OR length(project_id) = 16),
    data_source TEXT NOT NULL CHECK (data_source IN ('internal', 'external', 'other')),
    chosen_field TEXT NOT NULL,
    chosen_value TEXT,
    inpt_id TEXT,
    api10 TEXT,
    api12 TEXT,
    api14 TEXT,
    aries_id TEXT,
    phdwin_id TEXT,
    revision INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_wells_identity ON wells (project_id, data_source, chosen_value);
CREATE INDEX IF NOT EXISTS idx_wells_chosen ON wells (chosen_value);

CREATE TABLE IF NOT EXISTS ownership (
    well_id BLOB PRIMARY KEY REFERENCES wells (well_id),
    data_source TEXT NOT NULL,
    chosen_value TEXT
);

CREATE TABLE IF NOT EXISTS production (
    record_id INTEGER PRIMARY KEY,
    well_id BLOB NOT NULL REFERENCES wells (well_id),
    project_id BLOB CHECK (project_id IS NULL OR length(project_id) = 16)
);
CREATE INDEX IF NOT EXISTS idx_production_well ON production (well_id);
";
