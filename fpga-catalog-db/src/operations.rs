//! Writes for catalog, system and core rows.

use std::path::Path;

use fpga_catalog_core::{CatalogRow, NewCatalogRow, NormalizedCore, NormalizedSystem};
use rusqlite::{Connection, params};
use thiserror::Error;

use crate::queries::find_catalog_by_id;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
}

impl OperationError {
    pub(crate) fn not_found(entity_type: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

fn path_text(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

// ── Catalog Operations ──────────────────────────────────────────────────────

/// Insert a new catalog row and return it as stored.
pub fn insert_catalog(conn: &Connection, row: &NewCatalogRow) -> Result<CatalogRow, OperationError> {
    conn.execute(
        "INSERT INTO catalogs (name, unique_name, url, version, priority, json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![row.name, row.unique_name, row.url, row.version, row.priority, row.json],
    )?;
    let id = conn.last_insert_rowid();
    find_catalog_by_id(conn, id)?.ok_or_else(|| OperationError::not_found("catalog", id))
}

/// Record the newest snapshot found by a check and flag the row.
pub fn set_latest(conn: &Connection, catalog_id: i64, latest_json: &str) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE catalogs SET latest_json = ?2, update_pending = 1 WHERE id = ?1",
        params![catalog_id, latest_json],
    )?;
    if changed == 0 {
        return Err(OperationError::not_found("catalog", catalog_id));
    }
    Ok(())
}

/// Replace the installed snapshot. A `None` pending snapshot clears the
/// pending flag.
pub fn install_snapshot(
    conn: &Connection,
    catalog_id: i64,
    current_json: &str,
    version: Option<&str>,
    pending_json: Option<&str>,
) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE catalogs SET
             json = ?2,
             version = ?3,
             latest_json = ?4,
             update_pending = ?5,
             last_update_at = datetime('now')
         WHERE id = ?1",
        params![
            catalog_id,
            current_json,
            version,
            pending_json,
            pending_json.is_some()
        ],
    )?;
    if changed == 0 {
        return Err(OperationError::not_found("catalog", catalog_id));
    }
    Ok(())
}

/// Change where a catalog sorts relative to the others.
pub fn set_priority(conn: &Connection, catalog_id: i64, priority: i64) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE catalogs SET priority = ?2 WHERE id = ?1",
        params![catalog_id, priority],
    )?;
    if changed == 0 {
        return Err(OperationError::not_found("catalog", catalog_id));
    }
    Ok(())
}

/// Remove a catalog along with its systems and cores.
pub fn delete_catalog(conn: &Connection, catalog_id: i64) -> Result<(), OperationError> {
    let changed = conn.execute("DELETE FROM catalogs WHERE id = ?1", params![catalog_id])?;
    if changed == 0 {
        return Err(OperationError::not_found("catalog", catalog_id));
    }
    Ok(())
}

// ── System Operations ───────────────────────────────────────────────────────

/// Insert or update a system of a catalog. Returns the row id.
pub fn upsert_system(
    conn: &Connection,
    catalog_id: i64,
    system: &NormalizedSystem,
    db_path: Option<&Path>,
) -> Result<i64, OperationError> {
    let id = conn.query_row(
        "INSERT INTO systems (catalog_id, unique_name, name, db_path)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(catalog_id, unique_name) DO UPDATE SET
             name = excluded.name,
             db_path = COALESCE(excluded.db_path, systems.db_path)
         RETURNING id",
        params![catalog_id, system.unique_name, system.name, path_text(db_path)],
        |row| row.get(0),
    )?;
    Ok(id)
}

// ── Core Operations ─────────────────────────────────────────────────────────

/// Insert or update a core of a catalog. Returns the row id.
pub fn upsert_core(
    conn: &Connection,
    catalog_id: i64,
    core: &NormalizedCore,
    rbf_path: Option<&Path>,
) -> Result<i64, OperationError> {
    let id = conn.query_row(
        "INSERT INTO cores (catalog_id, unique_name, name, rbf_path)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(catalog_id, unique_name) DO UPDATE SET
             name = excluded.name,
             rbf_path = COALESCE(excluded.rbf_path, cores.rbf_path)
         RETURNING id",
        params![catalog_id, core.unique_name, core.name, path_text(rbf_path)],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Link a core to the named systems of its catalog. Names that are not
/// registered are skipped. Returns the number of links present afterwards.
pub fn link_core_systems(
    conn: &Connection,
    catalog_id: i64,
    core_id: i64,
    system_names: &[String],
) -> Result<usize, OperationError> {
    conn.execute(
        "DELETE FROM cores_systems WHERE core_id = ?1",
        params![core_id],
    )?;

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO cores_systems (core_id, system_id)
         SELECT ?1, id FROM systems WHERE catalog_id = ?2 AND unique_name = ?3",
    )?;
    let mut linked = 0;
    for name in system_names {
        let n = stmt.execute(params![core_id, catalog_id, name])?;
        if n == 0 {
            log::debug!("Core {core_id} references unregistered system '{name}'");
        }
        linked += n;
    }
    Ok(linked)
}
