pub(crate) mod add;
pub(crate) mod check;
pub(crate) mod config;
pub(crate) mod install;
pub(crate) mod list;
pub(crate) mod updates;
pub(crate) mod upgrade;

use std::cell::RefCell;

use fpga_catalog_core::{CatalogRow, Settings};
use fpga_catalog_db::{Connection, HandleRegistry, SqliteStore};
use fpga_catalog_remote::{Ed25519Verifier, HttpRemote, Updater};

use crate::CliError;
use crate::prompt::TerminalPrompt;
use crate::spinner::StateSpinner;

pub(crate) type CliUpdater<'c> =
    Updater<SqliteStore<'c>, HttpRemote, Option<Ed25519Verifier>, TerminalPrompt>;

/// Registry name of the catalog database handle.
const CATALOG_DB: &str = "catalogs";

/// Resolved settings shared by every command.
pub(crate) struct Context {
    pub(crate) settings: Settings,
    pub(crate) quiet: bool,
    databases: RefCell<HandleRegistry>,
}

impl Context {
    pub(crate) fn new(settings: Settings, quiet: bool) -> Self {
        let path = settings.database.value.clone();
        let root = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
        Self {
            settings,
            quiet,
            databases: RefCell::new(HandleRegistry::new(root).with_path(CATALOG_DB, path)),
        }
    }

    /// Run `f` with the catalog database, creating it and its directory if
    /// needed.
    pub(crate) fn with_db<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, CliError>,
    ) -> Result<T, CliError> {
        let mut databases = self.databases.borrow_mut();
        let path = databases.path_of(CATALOG_DB);
        databases
            .with_handle(CATALOG_DB, |conn| f(conn))
            .map_err(|e| CliError::database(format!("Failed to open {}: {}", path.display(), e)))?
    }

    pub(crate) fn verifier(&self) -> Result<Option<Ed25519Verifier>, CliError> {
        self.settings
            .public_key
            .value
            .as_deref()
            .map(Ed25519Verifier::from_base64)
            .transpose()
            .map_err(|e| CliError::config(e.to_string()))
    }

    pub(crate) fn updater<'c>(
        &self,
        conn: &'c Connection,
        spinner: &StateSpinner,
        label: &str,
    ) -> Result<CliUpdater<'c>, CliError> {
        let remote = HttpRemote::with_timeout(self.settings.timeout.value)?;
        Ok(Updater::new(
            SqliteStore::new(conn),
            remote,
            self.verifier()?,
            TerminalPrompt::new(),
            self.settings.root.value.clone(),
        )
        .with_observer(spinner.observer(label.to_string())))
    }
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {}", e)))
}

pub(crate) fn find_row(conn: &Connection, unique_name: &str) -> Result<CatalogRow, CliError> {
    fpga_catalog_db::find_catalog(conn, unique_name)
        .map_err(|e| CliError::database(format!("Failed to look up catalog: {}", e)))?
        .ok_or_else(|| CliError::unknown_catalog(unique_name))
}

pub(crate) fn log_cancelled() {
    log::info!("Cancelled.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpga_catalog_core::Overrides;
    use fpga_catalog_core::settings::SettingsFile;

    fn context(db: std::path::PathBuf) -> Context {
        let settings = Settings::resolve(
            Overrides {
                database: Some(db),
                root: None,
            },
            |_| None,
            SettingsFile::default(),
        )
        .unwrap();
        Context::new(settings, true)
    }

    #[test]
    fn database_is_created_at_the_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("state").join("catalogs.db");
        let ctx = context(db.clone());

        let rows = ctx
            .with_db(|conn| {
                fpga_catalog_db::list_catalogs(conn, &Default::default())
                    .map_err(|e| CliError::database(e.to_string()))
            })
            .unwrap();
        assert!(rows.is_empty());
        assert!(db.exists());
    }

    #[test]
    fn the_handle_stays_open_between_commands() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path().join("catalogs.sqlite"));

        ctx.with_db(|conn| {
            conn.execute_batch("CREATE TEMP TABLE scratch (x);")
                .map_err(|e| CliError::database(e.to_string()))
        })
        .unwrap();
        let kept = ctx
            .with_db(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_temp_master WHERE name='scratch')",
                    [],
                    |row| row.get::<_, bool>(0),
                )
                .map_err(|e| CliError::database(e.to_string()))
            })
            .unwrap();
        assert!(kept);
    }

    #[test]
    fn unknown_catalog_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path().join("catalogs.sqlite"));
        let err = ctx.with_db(|conn| find_row(conn, "missing")).unwrap_err();
        assert!(matches!(err, CliError::UnknownCatalog(_)));
    }
}
