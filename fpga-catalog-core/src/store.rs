//! The persistence contract for installed catalogs.
//!
//! Snapshots are stored as opaque JSON. The store only needs to know the
//! handful of columns the updater filters and sorts on.

use std::path::{Path, PathBuf};

use crate::diff::diff;
use crate::types::{NormalizedCatalog, NormalizedCore, NormalizedSystem};

/// A persisted catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub id: i64,
    pub name: String,
    pub unique_name: String,
    /// The URL the catalog was added from.
    pub url: String,
    pub last_update_at: String,
    pub version: Option<String>,
    /// Lower values are listed first.
    pub priority: i64,
    pub update_pending: bool,
    /// The installed snapshot.
    pub json: String,
    /// The newest snapshot seen by a check, if it was newer than `json`.
    pub latest_json: Option<String>,
}

impl CatalogRow {
    pub fn current(&self) -> Result<NormalizedCatalog, serde_json::Error> {
        serde_json::from_str(&self.json)
    }

    pub fn latest(&self) -> Result<Option<NormalizedCatalog>, serde_json::Error> {
        self.latest_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }

    /// The entries of the latest snapshot that are newer than the installed one.
    pub fn latest_diff(&self) -> Result<NormalizedCatalog, serde_json::Error> {
        let current = self.current()?;
        let latest = self.latest()?;
        Ok(diff(&current, latest.as_ref()))
    }
}

/// The fields needed to create a catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogRow {
    pub name: String,
    pub unique_name: String,
    pub url: String,
    pub version: Option<String>,
    pub json: String,
    pub priority: i64,
}

impl NewCatalogRow {
    pub fn from_snapshot(
        url: impl Into<String>,
        snapshot: &NormalizedCatalog,
        priority: i64,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name: snapshot.name.clone(),
            unique_name: snapshot.unique_name.clone(),
            url: url.into(),
            version: Some(snapshot.catalog_version()),
            json: serde_json::to_string(snapshot)?,
            priority,
        })
    }
}

/// A registered core or system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub id: i64,
    /// The file previously recorded for the entry, when the new path
    /// replaces it.
    pub replaced: Option<PathBuf>,
}

impl Registered {
    /// `previous` is replaced only by a different, non-empty new path.
    pub fn new(id: i64, previous: Option<PathBuf>, new: Option<&Path>) -> Self {
        let replaced = match new {
            Some(new) => previous.filter(|p| p != new),
            None => None,
        };
        Self { id, replaced }
    }
}

/// Row storage used by the installer and the updater.
pub trait CatalogStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_catalog_row(&mut self, row: NewCatalogRow) -> Result<CatalogRow, Self::Error>;

    /// Record a newer snapshot and mark the row as having an update pending.
    fn set_latest(&mut self, row: &CatalogRow, latest_json: &str) -> Result<(), Self::Error>;

    /// All catalogs, by ascending priority.
    fn list_catalog_rows(&self) -> Result<Vec<CatalogRow>, Self::Error>;

    /// Replace the installed snapshot. `pending_json` is what remains to be
    /// applied; `None` clears the pending update.
    fn install_snapshot(
        &mut self,
        row: &CatalogRow,
        current_json: &str,
        version: Option<&str>,
        pending_json: Option<&str>,
    ) -> Result<(), Self::Error>;

    /// Upsert a system. A `None` path keeps the recorded one.
    fn register_system(
        &mut self,
        row: &CatalogRow,
        system: &NormalizedSystem,
        db_path: Option<&Path>,
    ) -> Result<Registered, Self::Error>;

    /// Upsert a core and link it to the systems it references that are
    /// already registered for the same catalog. A `None` path keeps the
    /// recorded one.
    fn register_core(
        &mut self,
        row: &CatalogRow,
        core: &NormalizedCore,
        rbf_path: Option<&Path>,
    ) -> Result<Registered, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_different_new_path_replaces() {
        let old = Some(PathBuf::from("/cores/nes.rbf"));
        let moved = Registered::new(1, old.clone(), Some(Path::new("/cores/nes-1.rbf")));
        assert_eq!(moved.replaced, old);

        let same = Registered::new(1, old.clone(), Some(Path::new("/cores/nes.rbf")));
        assert_eq!(same.replaced, None);

        let kept = Registered::new(1, old, None);
        assert_eq!(kept.replaced, None);

        let first = Registered::new(1, None, Some(Path::new("/cores/nes.rbf")));
        assert_eq!(first.replaced, None);
    }
}
