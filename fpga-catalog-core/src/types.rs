//! Data model types for remote catalogs.
//!
//! These types mirror the JSON documents served by a catalog host: the
//! top-level catalog, its cores, systems and releases, and the file
//! manifests they point to. Normalized variants carry the provenance of
//! the document they were resolved from.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` of the bitstream file in a core release.
pub const CORE_RBF_TYPE: &str = "mister.core.rbf";

// ── Version ─────────────────────────────────────────────────────────────────

/// A version as it appears in catalog JSON: either a string or a plain number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

// ── File ────────────────────────────────────────────────────────────────────

/// A downloadable artifact and the manifest it must match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    /// Hex-encoded SHA-256 of the content.
    pub sha256: String,
    /// Base64-encoded detached signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl File {
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

// ── Release ─────────────────────────────────────────────────────────────────

/// One published version of a core or of the platform binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub files: Vec<File>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

// ── Core ────────────────────────────────────────────────────────────────────

/// The systems a core can run: a single unique name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemRefs {
    One(String),
    Many(Vec<String>),
}

impl SystemRefs {
    pub fn names(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }

    pub fn contains(&self, unique_name: &str) -> bool {
        self.names().iter().any(|n| n == unique_name)
    }
}

/// An emulator core and its releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Core {
    pub name: String,
    pub unique_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub releases: Vec<Release>,
    pub systems: SystemRefs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

// ── System ──────────────────────────────────────────────────────────────────

/// A gaming system and its metadata database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub name: String,
    pub unique_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<File>,
    /// Legacy games database format, no longer installable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_db: Option<File>,
}

// ── Catalog ─────────────────────────────────────────────────────────────────

/// The top-level catalog document as served, before normalization.
///
/// Containers are kept as raw JSON: each one is a versioned reference that
/// only the resolver knows how to follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub name: String,
    pub unique_name: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systems: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releases: Option<Value>,
}

/// A container document before its entries are resolved.
pub type RawContainer = BTreeMap<String, Value>;

// ── Normalized ──────────────────────────────────────────────────────────────

/// A value together with the URL it was resolved from and the version
/// declared by the reference that pointed to it.
///
/// Serializes as the fields of `T` plus `_url` and `_version`, so `T` must
/// be a struct or a map when the value is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized<T> {
    #[serde(rename = "_url", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub value: T,
}

impl<T> Normalized<T> {
    pub fn new(value: T, url: Option<String>, version: Option<String>) -> Self {
        Self {
            url,
            version,
            value,
        }
    }

    /// Wrap a value with no provenance.
    pub fn bare(value: T) -> Self {
        Self::new(value, None, None)
    }

    /// Carry this value's provenance over to another value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        Normalized {
            url: self.url,
            version: self.version,
            value: f(self.value),
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Default> Default for Normalized<T> {
    fn default() -> Self {
        Self::bare(T::default())
    }
}

impl<T> Deref for Normalized<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Normalized<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

pub type NormalizedCore = Normalized<Core>;
pub type NormalizedSystem = Normalized<System>;
pub type NormalizedRelease = Normalized<Release>;
pub type NormalizedCores = Normalized<BTreeMap<String, NormalizedCore>>;
pub type NormalizedSystems = Normalized<BTreeMap<String, NormalizedSystem>>;
pub type NormalizedReleases = Normalized<BTreeMap<String, Vec<NormalizedRelease>>>;

/// The resolved body of a catalog: every container and entry is concrete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub name: String,
    pub unique_name: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<NormalizedCores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systems: Option<NormalizedSystems>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub releases: Option<NormalizedReleases>,
}

pub type NormalizedCatalog = Normalized<CatalogSnapshot>;

impl NormalizedCatalog {
    pub fn core(&self, unique_name: &str) -> Option<&NormalizedCore> {
        self.cores.as_ref().and_then(|c| c.get(unique_name))
    }

    pub fn system(&self, unique_name: &str) -> Option<&NormalizedSystem> {
        self.systems.as_ref().and_then(|s| s.get(unique_name))
    }

    pub fn releases_of(&self, name: &str) -> Option<&[NormalizedRelease]> {
        self.releases
            .as_ref()
            .and_then(|r| r.get(name))
            .map(Vec::as_slice)
    }

    /// True when no container holds an entry.
    pub fn is_empty(&self) -> bool {
        self.cores.as_ref().is_none_or(|c| c.is_empty())
            && self.systems.as_ref().is_none_or(|s| s.is_empty())
            && self.releases.as_ref().is_none_or(|r| r.is_empty())
    }

    /// The declared catalog version, as stored alongside the catalog row.
    pub fn catalog_version(&self) -> String {
        self.value.version.to_string()
    }
}
