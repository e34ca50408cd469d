//! The catalog database schema.
//!
//! There is one schema, stamped into SQLite's `user_version`. A database
//! stamped with any other version is refused, never rewritten.

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Unsupported catalog database version {found} (expected {expected})")]
    UnsupportedVersion { expected: i32, found: i32 },
}

/// The `user_version` of a database created by [`create_schema`].
pub const SCHEMA_VERSION: i32 = 1;

/// Create all tables and indexes and stamp the schema version.
///
/// Safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// The stamped schema version; 0 for a database with no schema yet.
pub fn schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Open or create a catalog database at the given path.
pub fn open_database(path: &Path) -> Result<Connection, SchemaError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    match schema_version(&conn)? {
        0 => {
            log::debug!("Creating catalog schema in {}", path.display());
            create_schema(&conn)?;
        }
        SCHEMA_VERSION => {}
        found => {
            return Err(SchemaError::UnsupportedVersion {
                expected: SCHEMA_VERSION,
                found,
            });
        }
    }
    Ok(conn)
}

/// Open an in-memory database with the full schema.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

const SCHEMA_SQL: &str = r#"
-- `json` is the installed snapshot, `latest_json` the newest snapshot found
-- by a check.
CREATE TABLE IF NOT EXISTS catalogs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    unique_name TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    last_update_at TEXT NOT NULL DEFAULT (datetime('now')),
    version TEXT,
    priority INTEGER NOT NULL DEFAULT 0,
    update_pending BOOLEAN NOT NULL DEFAULT 0,
    json TEXT NOT NULL,
    latest_json TEXT
);
CREATE INDEX IF NOT EXISTS idx_catalogs_url ON catalogs(url);
CREATE INDEX IF NOT EXISTS idx_catalogs_priority ON catalogs(priority);

CREATE TABLE IF NOT EXISTS systems (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    catalog_id INTEGER NOT NULL REFERENCES catalogs(id) ON DELETE CASCADE,
    unique_name TEXT NOT NULL,
    name TEXT NOT NULL,
    db_path TEXT,
    UNIQUE(catalog_id, unique_name)
);

CREATE TABLE IF NOT EXISTS cores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    catalog_id INTEGER NOT NULL REFERENCES catalogs(id) ON DELETE CASCADE,
    unique_name TEXT NOT NULL,
    name TEXT NOT NULL,
    rbf_path TEXT,
    UNIQUE(catalog_id, unique_name)
);

CREATE TABLE IF NOT EXISTS cores_systems (
    core_id INTEGER NOT NULL REFERENCES cores(id) ON DELETE CASCADE,
    system_id INTEGER NOT NULL REFERENCES systems(id) ON DELETE CASCADE,
    PRIMARY KEY (core_id, system_id)
);
CREATE INDEX IF NOT EXISTS idx_cores_systems_system ON cores_systems(system_id);
"#;
