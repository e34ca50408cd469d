//! Fetching, verifying and installing catalog content.
//!
//! The pipeline runs in four steps: [`normalize`] resolves a catalog's
//! reference graph into a snapshot, [`fpga_catalog_core::diff`] finds what
//! changed, [`install`] plans and downloads the selected artifacts through
//! [`files`], and [`update`] drives all of it against a
//! [`fpga_catalog_core::CatalogStore`].

pub mod client;
pub mod error;
pub mod files;
pub mod hasher;
pub mod install;
pub mod normalize;
pub mod remote;
pub mod trust;
pub mod update;

pub use client::HttpRemote;
pub use error::{ErrorKind, IntegrityCheck, RemoteError};
pub use files::{check_artifact, download_and_check, download_artifact};
pub use install::{
    Artifact, PlatformUpgrade, Selection, SelectionFilter, core_artifacts, download_core,
    download_system, select_entries, system_artifacts, upgrade_platform,
};
pub use normalize::{Normalizer, fallback_url, fetch_and_normalize_catalog, parse_catalog_url};
pub use remote::{NeverRetry, Outcome, Remote, RetryDecision, RetryPrompt};
pub use trust::{Ed25519Verifier, NoTrustedKey, SignatureVerifier};
pub use update::{InstallReport, UpdateState, Updater};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
