//! Named database handles opened under a root directory.
//!
//! Each name maps to `<root>/<name>.sqlite` unless it was given an explicit
//! file. Handles are opened on first use and stay open until released or
//! until the registry is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;

use crate::schema::{SchemaError, open_database};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid database name '{0}'")]
    InvalidName(String),
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub struct HandleRegistry {
    root: PathBuf,
    paths: HashMap<String, PathBuf>,
    handles: HashMap<String, Connection>,
}

impl HandleRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    /// Open `name` from `path` instead of `<root>/<name>.sqlite`.
    pub fn with_path(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(name.into(), path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        match self.paths.get(name) {
            Some(path) => path.clone(),
            None => self.root.join(format!("{name}.sqlite")),
        }
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Run `f` with the handle for `name`, opening it first if needed.
    pub fn with_handle<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Connection) -> T,
    ) -> Result<T, RegistryError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if !self.handles.contains_key(name) {
            let path = self.path_of(name);
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(|source| RegistryError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
            log::debug!("Opening database handle '{name}' at {}", path.display());
            let conn = open_database(&path)?;
            self.handles.insert(name.to_string(), conn);
        }
        match self.handles.get_mut(name) {
            Some(conn) => Ok(f(conn)),
            None => Err(RegistryError::InvalidName(name.to_string())),
        }
    }

    /// Close the handle for `name`. Returns whether it was open.
    pub fn release(&mut self, name: &str) -> bool {
        let released = self.handles.remove(name).is_some();
        if released {
            log::debug!("Released database handle '{name}'");
        }
        released
    }

    pub fn release_all(&mut self) {
        for (name, _) in self.handles.drain() {
            log::debug!("Released database handle '{name}'");
        }
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
