//! Read queries for the catalog database.

use fpga_catalog_core::CatalogRow;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::operations::OperationError;

const CATALOG_COLUMNS: &str = "id, name, unique_name, url, last_update_at, version,
                               priority, update_pending, json, latest_json";

fn row_to_catalog(row: &Row) -> rusqlite::Result<CatalogRow> {
    Ok(CatalogRow {
        id: row.get(0)?,
        name: row.get(1)?,
        unique_name: row.get(2)?,
        url: row.get(3)?,
        last_update_at: row.get(4)?,
        version: row.get(5)?,
        priority: row.get(6)?,
        update_pending: row.get(7)?,
        json: row.get(8)?,
        latest_json: row.get(9)?,
    })
}

// ── Catalog Queries ─────────────────────────────────────────────────────────

/// Narrows [`list_catalogs`]. The default matches every catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub url: Option<String>,
    pub update_pending: Option<bool>,
}

impl CatalogFilter {
    pub fn pending() -> Self {
        Self {
            update_pending: Some(true),
            ..Self::default()
        }
    }
}

/// List catalogs by ascending priority.
pub fn list_catalogs(
    conn: &Connection,
    filter: &CatalogFilter,
) -> Result<Vec<CatalogRow>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CATALOG_COLUMNS} FROM catalogs
         WHERE (?1 IS NULL OR url = ?1)
           AND (?2 IS NULL OR update_pending = ?2)
         ORDER BY priority, id"
    ))?;
    let rows = stmt.query_map(params![filter.url, filter.update_pending], row_to_catalog)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn find_catalog_by_id(conn: &Connection, id: i64) -> Result<Option<CatalogRow>, OperationError> {
    conn.query_row(
        &format!("SELECT {CATALOG_COLUMNS} FROM catalogs WHERE id = ?1"),
        params![id],
        row_to_catalog,
    )
    .optional()
    .map_err(Into::into)
}

pub fn find_catalog(
    conn: &Connection,
    unique_name: &str,
) -> Result<Option<CatalogRow>, OperationError> {
    conn.query_row(
        &format!("SELECT {CATALOG_COLUMNS} FROM catalogs WHERE unique_name = ?1"),
        params![unique_name],
        row_to_catalog,
    )
    .optional()
    .map_err(Into::into)
}

/// Whether a catalog was added from `url` or is already installed under
/// `unique_name`.
pub fn catalog_exists(
    conn: &Connection,
    url: &str,
    unique_name: &str,
) -> Result<bool, OperationError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM catalogs WHERE url = ?1 OR unique_name = ?2)",
        params![url, unique_name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

// ── System Queries ──────────────────────────────────────────────────────────

/// A registered system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRow {
    pub id: i64,
    pub catalog_id: i64,
    pub unique_name: String,
    pub name: String,
    pub db_path: Option<String>,
}

fn row_to_system(row: &Row) -> rusqlite::Result<SystemRow> {
    Ok(SystemRow {
        id: row.get(0)?,
        catalog_id: row.get(1)?,
        unique_name: row.get(2)?,
        name: row.get(3)?,
        db_path: row.get(4)?,
    })
}

/// List all systems, ordered by catalog priority then name.
pub fn list_systems(conn: &Connection) -> Result<Vec<SystemRow>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.catalog_id, s.unique_name, s.name, s.db_path
         FROM systems s JOIN catalogs c ON c.id = s.catalog_id
         ORDER BY c.priority, c.id, s.unique_name",
    )?;
    let rows = stmt.query_map([], row_to_system)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// The database file recorded for a system of a catalog.
pub fn system_db_path(
    conn: &Connection,
    catalog_id: i64,
    unique_name: &str,
) -> Result<Option<String>, OperationError> {
    let path = conn
        .query_row(
            "SELECT db_path FROM systems WHERE catalog_id = ?1 AND unique_name = ?2",
            params![catalog_id, unique_name],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(path.flatten())
}

/// Systems a core is linked to.
pub fn systems_for_core(conn: &Connection, core_id: i64) -> Result<Vec<SystemRow>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.catalog_id, s.unique_name, s.name, s.db_path
         FROM systems s JOIN cores_systems cs ON cs.system_id = s.id
         WHERE cs.core_id = ?1
         ORDER BY s.unique_name",
    )?;
    let rows = stmt.query_map(params![core_id], row_to_system)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ── Core Queries ────────────────────────────────────────────────────────────

/// A registered core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreRow {
    pub id: i64,
    pub catalog_id: i64,
    pub unique_name: String,
    pub name: String,
    pub rbf_path: Option<String>,
}

fn row_to_core(row: &Row) -> rusqlite::Result<CoreRow> {
    Ok(CoreRow {
        id: row.get(0)?,
        catalog_id: row.get(1)?,
        unique_name: row.get(2)?,
        name: row.get(3)?,
        rbf_path: row.get(4)?,
    })
}

pub fn cores_for_catalog(conn: &Connection, catalog_id: i64) -> Result<Vec<CoreRow>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT id, catalog_id, unique_name, name, rbf_path
         FROM cores WHERE catalog_id = ?1 ORDER BY unique_name",
    )?;
    let rows = stmt.query_map(params![catalog_id], row_to_core)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// The bitstream recorded for a core of a catalog.
pub fn core_rbf_path(
    conn: &Connection,
    catalog_id: i64,
    unique_name: &str,
) -> Result<Option<String>, OperationError> {
    let path = conn
        .query_row(
            "SELECT rbf_path FROM cores WHERE catalog_id = ?1 AND unique_name = ?2",
            params![catalog_id, unique_name],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(path.flatten())
}

/// Cores that can run a system.
pub fn cores_for_system(conn: &Connection, system_id: i64) -> Result<Vec<CoreRow>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.catalog_id, c.unique_name, c.name, c.rbf_path
         FROM cores c JOIN cores_systems cs ON cs.core_id = c.id
         WHERE cs.system_id = ?1
         ORDER BY c.unique_name",
    )?;
    let rows = stmt.query_map(params![system_id], row_to_core)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}
