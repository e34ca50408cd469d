//! The check-and-apply state machine.
//!
//! ```text
//! Idle -> CheckingForUpdates -> NoUpdate -> Idle
//!                            -> UpdateAvailable -> Downloading -> Verifying -> Installing -> Idle
//! ```
//!
//! Any failure returns the machine to `Idle`. Rows are only written in the
//! `Installing` state, after every artifact has been verified.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use fpga_catalog_core::*;
use url::Url;

use crate::error::RemoteError;
use crate::files::discard;
use crate::install::{
    Artifact, PlatformUpgrade, Selection, SelectionFilter, core_artifacts, fetch_artifacts,
    select_entries, system_artifacts, upgrade_platform, verify_artifacts,
};
use crate::normalize::fetch_and_normalize_catalog;
use crate::remote::{Outcome, Remote, RetryDecision, RetryPrompt};
use crate::trust::SignatureVerifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    CheckingForUpdates,
    NoUpdate,
    UpdateAvailable,
    Downloading,
    Verifying,
    Installing,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CheckingForUpdates => "checking for updates",
            Self::NoUpdate => "no update",
            Self::UpdateAvailable => "update available",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Installing => "installing",
        };
        f.write_str(s)
    }
}

/// What an install registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Systems and the path of their database, if they have one.
    pub systems: Vec<(String, Option<PathBuf>)>,
    /// Cores and the path of their bitstream.
    pub cores: Vec<(String, PathBuf)>,
}

impl InstallReport {
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty() && self.cores.is_empty()
    }
}

/// The artifacts planned for one selected entry.
struct Planned<'s> {
    artifacts: Vec<Artifact>,
    entry: PlannedEntry<'s>,
}

enum PlannedEntry<'s> {
    System(&'s NormalizedSystem),
    Core(&'s NormalizedCore),
}

type Observer = Box<dyn FnMut(UpdateState)>;

/// Drives catalog checks and installs against a store.
pub struct Updater<S, R, V, P> {
    store: S,
    remote: R,
    verifier: V,
    prompt: P,
    root: PathBuf,
    state: UpdateState,
    observer: Option<Observer>,
}

impl<S, R, V, P> Updater<S, R, V, P>
where
    S: CatalogStore,
    R: Remote,
    V: SignatureVerifier,
    P: RetryPrompt,
{
    /// `root` is the directory artifacts are downloaded under.
    pub fn new(store: S, remote: R, verifier: V, prompt: P, root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            remote,
            verifier,
            prompt,
            root: root.into(),
            state: UpdateState::Idle,
            observer: None,
        }
    }

    /// Call `f` on every state transition.
    pub fn with_observer(mut self, f: impl FnMut(UpdateState) + 'static) -> Self {
        self.observer = Some(Box::new(f));
        self
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn transition(&mut self, next: UpdateState) {
        if self.state != next {
            log::debug!("Updater: {} -> {}", self.state, next);
            self.state = next;
            if let Some(f) = self.observer.as_mut() {
                f(next);
            }
        }
    }

    /// Return to `Idle` whatever `result` is.
    fn settle<T>(&mut self, result: Result<T, RemoteError>) -> Result<T, RemoteError> {
        self.transition(UpdateState::Idle);
        result
    }

    // ── Fetching ────────────────────────────────────────────────────────────

    /// Fetch and normalize a catalog, asking the prompt after every failure
    /// that is not a validation error.
    pub async fn fetch_catalog(
        &mut self,
        url: &str,
    ) -> Result<Outcome<NormalizedCatalog>, RemoteError> {
        loop {
            let err = match fetch_and_normalize_catalog(&self.remote, &mut self.prompt, url).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if !e.allows_fallback() => return Err(e),
                Err(e) => e,
            };
            match self.prompt.on_fetch_error(url, &err) {
                RetryDecision::Retry => log::debug!("Retrying catalog {url}"),
                RetryDecision::Cancel => return Ok(Outcome::Cancelled),
            }
        }
    }

    /// Fetch a catalog and store it as a new row.
    pub async fn add_catalog(
        &mut self,
        url: &str,
        priority: i64,
    ) -> Result<Outcome<CatalogRow>, RemoteError> {
        let catalog = match self.fetch_catalog(url).await? {
            Outcome::Completed(c) => c,
            Outcome::Cancelled => return Ok(Outcome::Cancelled),
        };

        let rows = self.store.list_catalog_rows().map_err(RemoteError::store)?;
        if let Some(existing) = rows
            .iter()
            .find(|r| r.url == url || r.unique_name == catalog.unique_name)
        {
            return Err(RemoteError::assertion(format!(
                "Catalog {} is already installed from {}",
                existing.unique_name, existing.url
            )));
        }

        let row = NewCatalogRow::from_snapshot(url, &catalog, priority)?;
        let row = self.store.create_catalog_row(row).map_err(RemoteError::store)?;
        log::debug!("Added catalog {} ({})", row.unique_name, row.url);
        Ok(Outcome::Completed(row))
    }

    // ── Checking ────────────────────────────────────────────────────────────

    /// Fetch the catalog of `row` again and record it if it is newer than the
    /// installed snapshot. Returns whether an update is available.
    pub async fn check(&mut self, row: &CatalogRow) -> Result<Outcome<bool>, RemoteError> {
        self.transition(UpdateState::CheckingForUpdates);
        let result = self.check_inner(row).await;
        match &result {
            Ok(Outcome::Completed(true)) => self.transition(UpdateState::UpdateAvailable),
            Ok(Outcome::Completed(false)) => self.transition(UpdateState::NoUpdate),
            _ => {}
        }
        self.settle(result)
    }

    async fn check_inner(&mut self, row: &CatalogRow) -> Result<Outcome<bool>, RemoteError> {
        let latest = match self.fetch_catalog(&row.url).await? {
            Outcome::Completed(c) => c,
            Outcome::Cancelled => return Ok(Outcome::Cancelled),
        };
        let current = row.current()?;
        if compare(&current, &latest) != Ordering::Less {
            log::debug!("Catalog {} is up to date", row.unique_name);
            return Ok(Outcome::Completed(false));
        }

        let json = serde_json::to_string(&latest)?;
        self.store
            .set_latest(row, &json)
            .map_err(RemoteError::store)?;
        log::debug!(
            "Catalog {} has an update: {} -> {}",
            row.unique_name,
            current.catalog_version(),
            latest.catalog_version()
        );
        Ok(Outcome::Completed(true))
    }

    /// Check every stored catalog. Returns the unique names of those with an
    /// update available.
    pub async fn check_all(&mut self) -> Result<Outcome<Vec<String>>, RemoteError> {
        let rows = self.store.list_catalog_rows().map_err(RemoteError::store)?;
        let mut updated = Vec::new();
        for row in rows {
            match self.check(&row).await? {
                Outcome::Completed(true) => updated.push(row.unique_name),
                Outcome::Completed(false) => {}
                Outcome::Cancelled => return Ok(Outcome::Cancelled),
            }
        }
        Ok(Outcome::Completed(updated))
    }

    /// The entries of the recorded latest snapshot that are newer than the
    /// installed ones.
    pub fn pending(&self, row: &CatalogRow) -> Result<NormalizedCatalog, RemoteError> {
        Ok(row.latest_diff()?)
    }

    // ── Installing ──────────────────────────────────────────────────────────

    /// Install entries of the current snapshot of `row`.
    pub async fn install(
        &mut self,
        row: &CatalogRow,
        filter: &SelectionFilter,
    ) -> Result<InstallReport, RemoteError> {
        let current = row.current()?;
        let result = self.install_entries(row, &current, filter).await;
        self.settle(result)
    }

    /// Install the pending update of `row`, then fold what was installed into
    /// the current snapshot.
    pub async fn apply_update(
        &mut self,
        row: &CatalogRow,
        filter: &SelectionFilter,
    ) -> Result<InstallReport, RemoteError> {
        let result = self.apply_update_inner(row, filter).await;
        self.settle(result)
    }

    async fn apply_update_inner(
        &mut self,
        row: &CatalogRow,
        filter: &SelectionFilter,
    ) -> Result<InstallReport, RemoteError> {
        let current = row.current()?;
        let latest = row.latest()?.ok_or_else(|| {
            RemoteError::assertion(format!("Catalog {} has no pending update", row.unique_name))
        })?;
        let pending = diff(&current, Some(&latest));
        self.transition(UpdateState::UpdateAvailable);

        let report = self.install_entries(row, &pending, filter).await?;

        let mut applied = AppliedEntries {
            cores: report.cores.iter().map(|(n, _)| n.clone()).collect(),
            systems: report.systems.iter().map(|(n, _)| n.clone()).collect(),
            releases: Default::default(),
        };
        // Platform releases are installed by `upgrade`, not here; a full
        // update only records them.
        if *filter == SelectionFilter::All {
            applied.releases = pending
                .releases
                .iter()
                .flat_map(|r| r.keys().cloned())
                .collect();
        }

        let folded = merge_applied(&current, &latest, &applied);
        let current_json = serde_json::to_string(&folded.current)?;
        let pending_json = folded
            .pending
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.store
            .install_snapshot(
                row,
                &current_json,
                Some(folded.current.catalog_version().as_str()),
                pending_json.as_deref(),
            )
            .map_err(RemoteError::store)?;
        Ok(report)
    }

    async fn install_entries(
        &mut self,
        row: &CatalogRow,
        snapshot: &NormalizedCatalog,
        filter: &SelectionFilter,
    ) -> Result<InstallReport, RemoteError> {
        let selection = select_entries(snapshot, filter);
        if selection.is_empty() {
            log::debug!("Nothing selected in catalog {}", row.unique_name);
            return Ok(InstallReport::default());
        }
        let planned = plan_selection(snapshot, &selection, &self.root)?;

        self.transition(UpdateState::Downloading);
        let mut downloaded: Vec<Vec<PathBuf>> = Vec::with_capacity(planned.len());
        for entry in &planned {
            match fetch_artifacts(&self.remote, &entry.artifacts).await {
                Ok(paths) => downloaded.push(paths),
                Err(e) => {
                    discard_downloads(&downloaded).await;
                    return Err(e);
                }
            }
        }

        self.transition(UpdateState::Verifying);
        for (i, (entry, paths)) in planned.iter().zip(&downloaded).enumerate() {
            if let Err(e) = verify_artifacts(&self.verifier, &entry.artifacts, paths).await {
                // The failing entry cleaned up after itself.
                discard_downloads(&downloaded[..i]).await;
                discard_downloads(&downloaded[i + 1..]).await;
                return Err(e);
            }
        }

        self.transition(UpdateState::Installing);
        let mut report = InstallReport::default();
        for (entry, paths) in planned.iter().zip(&downloaded) {
            match entry.entry {
                PlannedEntry::System(system) => {
                    let db = paths.first().map(PathBuf::as_path);
                    let registered = self
                        .store
                        .register_system(row, system, db)
                        .map_err(RemoteError::store)?;
                    remove_replaced(registered, paths).await;
                    report
                        .systems
                        .push((system.unique_name.clone(), db.map(Path::to_path_buf)));
                }
                PlannedEntry::Core(core) => {
                    let rbf = entry
                        .artifacts
                        .iter()
                        .zip(paths)
                        .find(|(a, _)| a.file.is_kind(CORE_RBF_TYPE))
                        .map(|(_, p)| p.clone())
                        .ok_or_else(|| {
                            RemoteError::assertion(format!(
                                "Core {} has no {CORE_RBF_TYPE} file",
                                core.unique_name
                            ))
                        })?;
                    let registered = self
                        .store
                        .register_core(row, core, Some(rbf.as_path()))
                        .map_err(RemoteError::store)?;
                    remove_replaced(registered, paths).await;
                    report.cores.push((core.unique_name.clone(), rbf));
                }
            }
        }
        Ok(report)
    }

    // ── Platform ────────────────────────────────────────────────────────────

    /// Download the newest platform release named `name` in the catalog of
    /// `row`, if it is newer than `running_version`.
    pub async fn upgrade_platform(
        &mut self,
        row: &CatalogRow,
        name: &str,
        running_version: &str,
    ) -> Result<PlatformUpgrade, RemoteError> {
        let snapshot = match row.latest()? {
            Some(latest) => latest,
            None => row.current()?,
        };
        let releases = snapshot.releases_of(name).ok_or_else(|| {
            RemoteError::assertion(format!(
                "Catalog {} has no releases named {name}",
                row.unique_name
            ))
        })?;
        let base = snapshot
            .releases
            .as_ref()
            .and_then(|r| r.url.as_ref())
            .or(snapshot.url.as_ref())
            .ok_or_else(|| RemoteError::assertion("No base URL to resolve releases against"))?;
        let base = Url::parse(base).map_err(|e| RemoteError::url(base.as_str(), e))?;
        let dest = self.root.join("releases").join(&row.unique_name).join(name);

        self.transition(UpdateState::Downloading);
        let result = upgrade_platform(
            &self.remote,
            &self.verifier,
            &base,
            releases,
            running_version,
            &dest,
        )
        .await;
        self.settle(result)
    }
}

fn plan_selection<'s>(
    snapshot: &NormalizedCatalog,
    selection: &'s Selection,
    root: &Path,
) -> Result<Vec<Planned<'s>>, RemoteError> {
    let systems = selection.systems.iter().map(|system| {
        Ok(Planned {
            artifacts: system_artifacts(snapshot, system, root)?,
            entry: PlannedEntry::System(system),
        })
    });
    let cores = selection.cores.iter().map(|core| {
        Ok(Planned {
            artifacts: core_artifacts(snapshot, core, None, root)?,
            entry: PlannedEntry::Core(core),
        })
    });
    systems.chain(cores).collect()
}

/// Delete the artifact a registration superseded, once the new path is
/// recorded.
async fn remove_replaced(registered: Registered, installed: &[PathBuf]) {
    if let Some(old) = registered.replaced.filter(|old| !installed.contains(old)) {
        log::debug!("Removing superseded {}", old.display());
        discard(&old).await;
    }
}

async fn discard_downloads(downloads: &[Vec<PathBuf>]) {
    for path in downloads.iter().flatten() {
        discard(path).await;
    }
}

#[cfg(test)]
#[path = "tests/update_tests.rs"]
mod tests;
