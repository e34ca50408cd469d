//! Planning and downloading the artifacts of catalog entries.
//!
//! Nothing here writes rows. Every artifact of an install is fetched and
//! verified before the caller registers anything, so a failed install leaves
//! the store untouched.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use fpga_catalog_core::*;
use futures::future::join_all;
use url::Url;

use crate::error::RemoteError;
use crate::files::{check_artifact, discard, download_and_check, download_artifact};
use crate::remote::Remote;
use crate::trust::{SignatureVerifier, decode_signature};

/// Which entries of a catalog to install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionFilter {
    #[default]
    All,
    /// Cores and systems with these unique names.
    Only(BTreeSet<String>),
}

impl SelectionFilter {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, unique_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(unique_name),
        }
    }
}

/// The entries picked out of a snapshot, in install order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub systems: Vec<NormalizedSystem>,
    pub cores: Vec<NormalizedCore>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty() && self.cores.is_empty()
    }
}

/// Cores matching `filter`, and the systems that are either matched by it or
/// needed by a selected core. Systems come first so cores can link to them.
pub fn select_entries(catalog: &NormalizedCatalog, filter: &SelectionFilter) -> Selection {
    let cores: Vec<NormalizedCore> = catalog
        .cores
        .iter()
        .flat_map(|c| c.values())
        .filter(|c| filter.matches(&c.unique_name))
        .cloned()
        .collect();

    let systems = catalog
        .systems
        .iter()
        .flat_map(|s| s.values())
        .filter(|s| {
            filter.matches(&s.unique_name) || cores.iter().any(|c| c.systems.contains(&s.unique_name))
        })
        .cloned()
        .collect();

    Selection { systems, cores }
}

/// One file to fetch: where from, what it must match, which directory it
/// lands in.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub url: Url,
    pub file: File,
    pub dest: PathBuf,
}

fn base_url(candidates: &[Option<&String>]) -> Result<Url, RemoteError> {
    let base = candidates
        .iter()
        .flatten()
        .next()
        .ok_or_else(|| RemoteError::assertion("No base URL to resolve files against"))?;
    Url::parse(base).map_err(|e| RemoteError::url(base.as_str(), e))
}

fn plan(base: &Url, files: &[File], dest: &Path) -> Result<Vec<Artifact>, RemoteError> {
    files
        .iter()
        .map(|file| {
            let url = base
                .join(&file.url)
                .map_err(|e| RemoteError::url(file.url.as_str(), e))?;
            Ok(Artifact {
                url,
                file: file.clone(),
                dest: dest.to_path_buf(),
            })
        })
        .collect()
}

/// The files of a core release and where they go.
///
/// `release` defaults to [`latest_of`] the core's releases. The release must
/// contain exactly one bitstream file.
pub fn core_artifacts(
    catalog: &NormalizedCatalog,
    core: &NormalizedCore,
    release: Option<&Release>,
    root: &Path,
) -> Result<Vec<Artifact>, RemoteError> {
    let release = release
        .or_else(|| latest_of(&core.releases))
        .ok_or_else(|| RemoteError::assertion(format!("Core {} has no release", core.unique_name)))?;

    let bitstreams = release
        .files
        .iter()
        .filter(|f| f.is_kind(CORE_RBF_TYPE))
        .count();
    if bitstreams != 1 {
        return Err(RemoteError::assertion(format!(
            "Core {} release must contain exactly one {CORE_RBF_TYPE} file, found {bitstreams}",
            core.unique_name
        )));
    }

    let base = base_url(&[
        core.url.as_ref(),
        catalog.cores.as_ref().and_then(|c| c.url.as_ref()),
        catalog.url.as_ref(),
    ])?;
    let dest = root
        .join("cores")
        .join(&catalog.unique_name)
        .join(&core.unique_name);
    plan(&base, &release.files, &dest)
}

/// The database file of a system, if it has one.
pub fn system_artifacts(
    catalog: &NormalizedCatalog,
    system: &NormalizedSystem,
    root: &Path,
) -> Result<Vec<Artifact>, RemoteError> {
    let Some(db) = &system.db else {
        if system.games_db.is_some() {
            return Err(RemoteError::assertion(format!(
                "System {} only has a gamesDb, which is no longer supported",
                system.unique_name
            )));
        }
        return Ok(Vec::new());
    };

    let base = base_url(&[
        system.url.as_ref(),
        catalog.systems.as_ref().and_then(|s| s.url.as_ref()),
        catalog.url.as_ref(),
    ])?;
    let dest = root
        .join("systems")
        .join(&catalog.unique_name)
        .join(&system.unique_name);
    plan(&base, std::slice::from_ref(db), &dest)
}

async fn discard_all(paths: &[PathBuf]) {
    for path in paths {
        discard(path).await;
    }
}

/// Download every artifact concurrently. If any download fails, the ones
/// that succeeded are deleted.
pub async fn fetch_artifacts<R: Remote>(
    remote: &R,
    artifacts: &[Artifact],
) -> Result<Vec<PathBuf>, RemoteError> {
    let results = join_all(
        artifacts
            .iter()
            .map(|a| download_artifact(remote, &a.url, &a.dest)),
    )
    .await;

    let mut paths = Vec::with_capacity(results.len());
    let mut failure = None;
    for result in results {
        match result {
            Ok(path) => paths.push(path),
            Err(e) if failure.is_none() => failure = Some(e),
            Err(e) => log::warn!("Download failed: {e}"),
        }
    }
    match failure {
        Some(e) => {
            discard_all(&paths).await;
            Err(e)
        }
        None => Ok(paths),
    }
}

/// Verify downloaded artifacts in order. On the first failure every path is
/// deleted.
pub async fn verify_artifacts<V: SignatureVerifier>(
    verifier: &V,
    artifacts: &[Artifact],
    paths: &[PathBuf],
) -> Result<(), RemoteError> {
    for (artifact, path) in artifacts.iter().zip(paths) {
        if let Err(e) = check_artifact(verifier, &artifact.file, path).await {
            discard_all(paths).await;
            return Err(e);
        }
    }
    Ok(())
}

fn rbf_path(artifacts: &[Artifact], paths: &[PathBuf]) -> Result<PathBuf, RemoteError> {
    artifacts
        .iter()
        .zip(paths)
        .find(|(a, _)| a.file.is_kind(CORE_RBF_TYPE))
        .map(|(_, p)| p.clone())
        .ok_or_else(|| RemoteError::assertion(format!("No {CORE_RBF_TYPE} file was downloaded")))
}

/// Download and verify a core release; returns the path of its bitstream.
pub async fn download_core<R: Remote, V: SignatureVerifier>(
    remote: &R,
    verifier: &V,
    catalog: &NormalizedCatalog,
    core: &NormalizedCore,
    release: Option<&Release>,
    root: &Path,
) -> Result<PathBuf, RemoteError> {
    let artifacts = core_artifacts(catalog, core, release, root)?;
    let paths = fetch_artifacts(remote, &artifacts).await?;
    verify_artifacts(verifier, &artifacts, &paths).await?;
    rbf_path(&artifacts, &paths)
}

/// Download and verify a system's database, if it has one.
pub async fn download_system<R: Remote, V: SignatureVerifier>(
    remote: &R,
    verifier: &V,
    catalog: &NormalizedCatalog,
    system: &NormalizedSystem,
    root: &Path,
) -> Result<Option<PathBuf>, RemoteError> {
    let artifacts = system_artifacts(catalog, system, root)?;
    let paths = fetch_artifacts(remote, &artifacts).await?;
    verify_artifacts(verifier, &artifacts, &paths).await?;
    Ok(paths.into_iter().next())
}

/// A verified platform binary, ready to hand to the external upgrader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformUpgrade {
    pub path: PathBuf,
    pub signature: Vec<u8>,
    pub version: Option<String>,
}

/// Download the platform release that should replace `running_version`.
///
/// The release must be strictly newer than the running version and consist
/// of exactly one signed file.
pub async fn upgrade_platform<R: Remote, V: SignatureVerifier>(
    remote: &R,
    verifier: &V,
    base: &Url,
    releases: &[NormalizedRelease],
    running_version: &str,
    dest: &Path,
) -> Result<PlatformUpgrade, RemoteError> {
    let release = latest_of(releases).ok_or_else(|| RemoteError::assertion("No platform release"))?;
    if compare(running_version, release) != Ordering::Less {
        return Err(RemoteError::assertion(format!(
            "Running version {running_version} is already up to date"
        )));
    }

    let [file] = release.files.as_slice() else {
        return Err(RemoteError::assertion(format!(
            "Platform release must contain exactly one file, found {}",
            release.files.len()
        )));
    };
    let signature = file
        .signature
        .as_deref()
        .ok_or_else(|| RemoteError::assertion(format!("Platform file {} is not signed", file.url)))?;
    let signature = decode_signature(signature).map_err(|e| RemoteError::Signature {
        path: PathBuf::from(&file.url),
        reason: format!("signature is not valid base64: {e}"),
    })?;

    let base = match &release.url {
        Some(u) => Url::parse(u).map_err(|e| RemoteError::url(u.as_str(), e))?,
        None => base.clone(),
    };
    let url = base
        .join(&file.url)
        .map_err(|e| RemoteError::url(file.url.as_str(), e))?;
    let path = download_and_check(remote, verifier, &url, file, dest).await?;

    log::debug!("Downloaded platform {} to {}", version_of(release).unwrap_or_default(), path.display());
    Ok(PlatformUpgrade {
        path,
        signature,
        version: version_of(release),
    })
}

#[cfg(test)]
#[path = "tests/install_tests.rs"]
mod tests;
