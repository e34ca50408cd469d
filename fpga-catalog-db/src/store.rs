//! [`CatalogStore`] backed by a SQLite connection.

use std::path::{Path, PathBuf};

use fpga_catalog_core::{
    CatalogRow, CatalogStore, NewCatalogRow, NormalizedCore, NormalizedSystem, Registered,
};
use rusqlite::Connection;

use crate::operations::{self, OperationError};
use crate::queries::{self, CatalogFilter};

/// Borrows a connection for the duration of an update run.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }
}

impl CatalogStore for SqliteStore<'_> {
    type Error = OperationError;

    fn create_catalog_row(&mut self, row: NewCatalogRow) -> Result<CatalogRow, OperationError> {
        operations::insert_catalog(self.conn, &row)
    }

    fn set_latest(&mut self, row: &CatalogRow, latest_json: &str) -> Result<(), OperationError> {
        operations::set_latest(self.conn, row.id, latest_json)
    }

    fn list_catalog_rows(&self) -> Result<Vec<CatalogRow>, OperationError> {
        queries::list_catalogs(self.conn, &CatalogFilter::default())
    }

    fn install_snapshot(
        &mut self,
        row: &CatalogRow,
        current_json: &str,
        version: Option<&str>,
        pending_json: Option<&str>,
    ) -> Result<(), OperationError> {
        operations::install_snapshot(self.conn, row.id, current_json, version, pending_json)
    }

    fn register_system(
        &mut self,
        row: &CatalogRow,
        system: &NormalizedSystem,
        db_path: Option<&Path>,
    ) -> Result<Registered, OperationError> {
        let previous = queries::system_db_path(self.conn, row.id, &system.unique_name)?;
        let id = operations::upsert_system(self.conn, row.id, system, db_path)?;
        Ok(Registered::new(id, previous.map(PathBuf::from), db_path))
    }

    fn register_core(
        &mut self,
        row: &CatalogRow,
        core: &NormalizedCore,
        rbf_path: Option<&Path>,
    ) -> Result<Registered, OperationError> {
        let previous = queries::core_rbf_path(self.conn, row.id, &core.unique_name)?;
        let id = operations::upsert_core(self.conn, row.id, core, rbf_path)?;
        operations::link_core_systems(self.conn, row.id, id, core.systems.names())?;
        Ok(Registered::new(id, previous.map(PathBuf::from), rbf_path))
    }
}
