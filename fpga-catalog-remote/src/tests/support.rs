//! Fixtures shared by the unit test suites.

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};

use fpga_catalog_core::{
    CatalogRow, CatalogStore, NewCatalogRow, NormalizedCore, NormalizedSystem, Registered,
};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::RemoteError;
use crate::files::create_target;
use crate::remote::Remote;

/// Serves JSON documents and file bodies from memory.
#[derive(Default)]
pub(crate) struct FakeRemote {
    docs: RefCell<HashMap<String, Value>>,
    files: RefCell<HashMap<String, Vec<u8>>>,
    failures: RefCell<HashMap<String, usize>>,
    requests: RefCell<Vec<String>>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn doc(self, url: &str, value: Value) -> Self {
        self.publish(url, value);
        self
    }

    /// Serve `value` at `url` from now on.
    pub(crate) fn publish(&self, url: &str, value: Value) {
        self.docs.borrow_mut().insert(url.to_string(), value);
    }

    pub(crate) fn file(self, url: &str, body: &[u8]) -> Self {
        self.publish_file(url, body);
        self
    }

    pub(crate) fn publish_file(&self, url: &str, body: &[u8]) {
        self.files.borrow_mut().insert(url.to_string(), body.to_vec());
    }

    /// Make the next `times` requests for `url` fail with a network error.
    pub(crate) fn failing(self, url: &str, times: usize) -> Self {
        self.failures.borrow_mut().insert(url.to_string(), times);
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    fn check_failure(&self, url: &Url) -> Result<(), RemoteError> {
        self.requests.borrow_mut().push(url.to_string());
        let mut failures = self.failures.borrow_mut();
        match failures.get_mut(url.as_str()) {
            Some(n) if *n > 0 => {
                *n -= 1;
                Err(RemoteError::network(url.as_str(), "connection reset"))
            }
            _ => Ok(()),
        }
    }
}

impl Remote for FakeRemote {
    async fn fetch_json(&self, url: &Url) -> Result<Value, RemoteError> {
        self.check_failure(url)?;
        self.docs
            .borrow()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn download(&self, url: &Url, dest: &Path) -> Result<PathBuf, RemoteError> {
        self.check_failure(url)?;
        let body = self
            .files
            .borrow()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                url: url.to_string(),
                status: 404,
            })?;
        let (path, mut file) = create_target(dest, url, None).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        Ok(path)
    }
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub(crate) fn manifest(url: &str, body: &[u8], kind: Option<&str>) -> fpga_catalog_core::File {
    fpga_catalog_core::File {
        url: url.to_string(),
        size: body.len() as u64,
        sha256: sha256_hex(body),
        signature: None,
        kind: kind.map(str::to_string),
    }
}

// ── In-memory store ─────────────────────────────────────────────────────────

/// A [`CatalogStore`] that keeps rows in vectors and records every write.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    pub(crate) rows: Vec<CatalogRow>,
    pub(crate) systems: Vec<(i64, String, Option<PathBuf>)>,
    pub(crate) cores: Vec<(i64, String, Option<PathBuf>)>,
}

impl MemoryStore {
    pub(crate) fn row(&self, unique_name: &str) -> CatalogRow {
        self.rows
            .iter()
            .find(|r| r.unique_name == unique_name)
            .cloned()
            .unwrap()
    }

    fn row_mut(&mut self, id: i64) -> &mut CatalogRow {
        self.rows.iter_mut().find(|r| r.id == id).unwrap()
    }

    /// The path currently recorded for `name`: the last one registered.
    fn recorded(
        entries: &[(i64, String, Option<PathBuf>)],
        catalog_id: i64,
        name: &str,
    ) -> Option<PathBuf> {
        entries
            .iter()
            .rev()
            .filter(|(id, n, _)| *id == catalog_id && n == name)
            .find_map(|(_, _, p)| p.clone())
    }
}

impl CatalogStore for MemoryStore {
    type Error = Infallible;

    fn create_catalog_row(&mut self, row: NewCatalogRow) -> Result<CatalogRow, Infallible> {
        let created = CatalogRow {
            id: self.rows.len() as i64 + 1,
            name: row.name,
            unique_name: row.unique_name,
            url: row.url,
            last_update_at: "now".into(),
            version: row.version,
            priority: row.priority,
            update_pending: false,
            json: row.json,
            latest_json: None,
        };
        self.rows.push(created.clone());
        Ok(created)
    }

    fn set_latest(&mut self, row: &CatalogRow, latest_json: &str) -> Result<(), Infallible> {
        let stored = self.row_mut(row.id);
        stored.latest_json = Some(latest_json.to_string());
        stored.update_pending = true;
        Ok(())
    }

    fn list_catalog_rows(&self) -> Result<Vec<CatalogRow>, Infallible> {
        let mut rows = self.rows.clone();
        rows.sort_by_key(|r| r.priority);
        Ok(rows)
    }

    fn install_snapshot(
        &mut self,
        row: &CatalogRow,
        current_json: &str,
        version: Option<&str>,
        pending_json: Option<&str>,
    ) -> Result<(), Infallible> {
        let stored = self.row_mut(row.id);
        stored.json = current_json.to_string();
        stored.version = version.map(str::to_string);
        stored.latest_json = pending_json.map(str::to_string);
        stored.update_pending = pending_json.is_some();
        Ok(())
    }

    fn register_system(
        &mut self,
        row: &CatalogRow,
        system: &NormalizedSystem,
        db_path: Option<&Path>,
    ) -> Result<Registered, Infallible> {
        let previous = Self::recorded(&self.systems, row.id, &system.unique_name);
        self.systems
            .push((row.id, system.unique_name.clone(), db_path.map(Path::to_path_buf)));
        Ok(Registered::new(self.systems.len() as i64, previous, db_path))
    }

    fn register_core(
        &mut self,
        row: &CatalogRow,
        core: &NormalizedCore,
        rbf_path: Option<&Path>,
    ) -> Result<Registered, Infallible> {
        let previous = Self::recorded(&self.cores, row.id, &core.unique_name);
        self.cores
            .push((row.id, core.unique_name.clone(), rbf_path.map(Path::to_path_buf)));
        Ok(Registered::new(self.cores.len() as i64, previous, rbf_path))
    }
}
