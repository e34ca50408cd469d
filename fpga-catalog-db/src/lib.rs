//! SQLite persistence for installed catalogs.
//!
//! Provides schema creation, row operations, read queries, a
//! [`fpga_catalog_core::CatalogStore`] implementation and a registry of
//! named database handles.

pub mod operations;
pub mod queries;
pub mod registry;
pub mod schema;
pub mod store;

pub use operations::{
    OperationError, delete_catalog, insert_catalog, install_snapshot, link_core_systems,
    set_latest, set_priority, upsert_core, upsert_system,
};
pub use queries::{
    CatalogFilter, CoreRow, SystemRow, catalog_exists, core_rbf_path, cores_for_catalog,
    cores_for_system, find_catalog, find_catalog_by_id, list_catalogs, list_systems,
    system_db_path, systems_for_core,
};
pub use registry::{HandleRegistry, RegistryError};
pub use schema::{SchemaError, open_database, open_memory};
pub use store::SqliteStore;

pub use rusqlite::Connection;
