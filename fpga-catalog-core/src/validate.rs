//! Schema validation for catalog documents.
//!
//! Deserialization checks the shape of a document; [`Validate`] checks the
//! invariants serde cannot express (hash format, version syntax, names that
//! end up as path components).

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::types::*;

/// A document does not match its schema and is not a resolvable reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error: {message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Prefix the message with the location of the offending value.
    pub fn at(self, location: impl std::fmt::Display) -> Self {
        Self::new(format!("{location}: {}", self.message))
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Invariants checked after a document has been deserialized.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// A schema-checked JSON document.
pub trait Document: Sized {
    fn from_json(value: Value) -> Result<Self, ValidationError>;
}

impl<T: DeserializeOwned + Validate> Document for T {
    fn from_json(value: Value) -> Result<Self, ValidationError> {
        let doc: T = serde_json::from_value(value)?;
        doc.validate()?;
        Ok(doc)
    }
}

/// The unique name an entry declares for itself, if its schema has one.
pub trait UniqueNamed {
    fn unique_name(&self) -> Option<&str>;
}

impl UniqueNamed for Core {
    fn unique_name(&self) -> Option<&str> {
        Some(&self.unique_name)
    }
}

impl UniqueNamed for System {
    fn unique_name(&self) -> Option<&str> {
        Some(&self.unique_name)
    }
}

impl UniqueNamed for Vec<Release> {
    fn unique_name(&self) -> Option<&str> {
        None
    }
}

// ── Field checks ────────────────────────────────────────────────────────────

const CATALOG_NAME_LEN: std::ops::RangeInclusive<usize> = 3..=64;

/// True if `s` is exactly 64 hex digits, in either case.
pub fn is_sha256(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// True if `s` matches `[0-9a-zA-Z][-0-9a-zA-Z._@()+]*`.
pub fn is_version_string(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '@' | '(' | ')' | '+'))
}

fn check_version(version: Option<&Version>) -> Result<(), ValidationError> {
    match version {
        Some(Version::Text(s)) if !is_version_string(s) => Err(ValidationError::new(format!(
            "invalid version {s:?}"
        ))),
        _ => Ok(()),
    }
}

fn check_unique_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("uniqueName must not be empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ValidationError::new(format!(
            "uniqueName {name:?} must not contain path separators"
        )));
    }
    Ok(())
}

// ── Schema impls ────────────────────────────────────────────────────────────

impl Validate for File {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::new("file url must not be empty"));
        }
        if !is_sha256(&self.sha256) {
            return Err(ValidationError::new(format!(
                "sha256 of {} must be 64 hex characters",
                self.url
            )));
        }
        Ok(())
    }
}

impl Validate for Release {
    fn validate(&self) -> Result<(), ValidationError> {
        check_version(self.version.as_ref())?;
        for file in &self.files {
            file.validate()?;
        }
        Ok(())
    }
}

impl Validate for Core {
    fn validate(&self) -> Result<(), ValidationError> {
        check_unique_name(&self.unique_name)
            .and_then(|_| self.releases.validate())
            .map_err(|e| e.at(format!("core {}", self.unique_name)))
    }
}

impl Validate for System {
    fn validate(&self) -> Result<(), ValidationError> {
        check_unique_name(&self.unique_name)
            .and_then(|_| self.db.as_ref().map_or(Ok(()), Validate::validate))
            .and_then(|_| self.games_db.as_ref().map_or(Ok(()), Validate::validate))
            .map_err(|e| e.at(format!("system {}", self.unique_name)))
    }
}

impl Validate for Catalog {
    fn validate(&self) -> Result<(), ValidationError> {
        let len = self.name.chars().count();
        if !CATALOG_NAME_LEN.contains(&len) {
            return Err(ValidationError::new(format!(
                "catalog name {:?} must be {} to {} characters",
                self.name,
                CATALOG_NAME_LEN.start(),
                CATALOG_NAME_LEN.end()
            )));
        }
        check_unique_name(&self.unique_name)?;
        check_version(Some(&self.version))
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        self.iter().try_for_each(Validate::validate)
    }
}

/// Containers are maps of references; their entries are checked once resolved.
impl Validate for BTreeMap<String, Value> {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}
