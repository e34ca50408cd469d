//! Resolution of a catalog's reference graph into a self-contained snapshot.
//!
//! The graph has a fixed depth: the catalog points at up to three
//! containers, and each container entry is a core, a system, or a list of
//! releases. Any of those nodes may be inline, a URL, or a `{url, version}`
//! pair.

use std::collections::BTreeMap;

use fpga_catalog_core::*;
use serde_json::Value;
use url::Url;

use crate::error::RemoteError;
use crate::remote::{Outcome, Remote, RetryDecision, RetryPrompt};

const CATALOG_FILE: &str = "catalog.json";

/// Resolves references, asking `prompt` what to do when a nested fetch fails.
pub struct Normalizer<'a, R, P> {
    remote: &'a R,
    prompt: &'a mut P,
}

impl<'a, R: Remote, P: RetryPrompt> Normalizer<'a, R, P> {
    pub fn new(remote: &'a R, prompt: &'a mut P) -> Self {
        Self { remote, prompt }
    }

    async fn fetch_nested(&mut self, url: &Url) -> Result<Value, RemoteError> {
        loop {
            match self.remote.fetch_json(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() => match self.prompt.on_fetch_error(url.as_str(), &e) {
                    RetryDecision::Retry => log::debug!("Retrying {url}"),
                    RetryDecision::Cancel => return Err(RemoteError::Cancelled),
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolve one versioned reference against `base`.
    pub async fn resolve<T: Document>(
        &mut self,
        base: &Url,
        value: Value,
    ) -> Result<Normalized<T>, RemoteError> {
        match VersionedRef::<T>::parse(value)? {
            VersionedRef::Inline(value) => Ok(Normalized::new(value, Some(base.to_string()), None)),
            VersionedRef::Remote { url, version } => {
                let resolved = join(base, &url)?;
                let json = self.fetch_nested(&resolved).await?;
                let value = T::from_json(json).map_err(|e| e.at(&resolved))?;
                Ok(Normalized::new(value, Some(resolved.to_string()), version))
            }
        }
    }

    /// Resolve a container and every entry in it. Entries resolve against the
    /// container's own URL.
    async fn resolve_container<T: Document + UniqueNamed>(
        &mut self,
        base: &Url,
        value: Value,
    ) -> Result<Normalized<BTreeMap<String, Normalized<T>>>, RemoteError> {
        let container = self.resolve::<RawContainer>(base, value).await?;
        let container_base = provenance_url(&container, base)?;

        let mut entries = BTreeMap::new();
        let Normalized {
            url,
            version,
            value: raw,
        } = container;
        for (key, raw_entry) in raw {
            let entry = self.resolve::<T>(&container_base, raw_entry).await?;
            if let Some(name) = entry.value.unique_name() {
                if name != key {
                    return Err(ValidationError::new(format!(
                        "entry {key:?} declares uniqueName {name:?}"
                    ))
                    .at(&container_base)
                    .into());
                }
            }
            entries.insert(key, entry);
        }
        Ok(Normalized::new(entries, url, version))
    }

    async fn resolve_releases(
        &mut self,
        base: &Url,
        value: Value,
    ) -> Result<NormalizedReleases, RemoteError> {
        let container = self.resolve_container::<Vec<Release>>(base, value).await?;
        Ok(container.map(|lists| {
            lists
                .into_iter()
                .map(|(name, list)| {
                    let Normalized {
                        url,
                        version,
                        value,
                    } = list;
                    let releases = value
                        .into_iter()
                        .map(|r| Normalized::new(r, url.clone(), version.clone()))
                        .collect();
                    (name, releases)
                })
                .collect()
        }))
    }

    /// Fetch the catalog at `url` and resolve everything it references.
    ///
    /// The top-level fetch is not retried here; a failure is left to the
    /// caller's fallback policy.
    pub async fn resolve_catalog(&mut self, url: &Url) -> Result<NormalizedCatalog, RemoteError> {
        log::debug!("Resolving catalog {url}");
        let json = self.remote.fetch_json(url).await?;
        let catalog = Catalog::from_json(json).map_err(|e| e.at(url))?;

        let cores = match catalog.cores {
            Some(v) => Some(self.resolve_container::<Core>(url, v).await?),
            None => None,
        };
        let systems = match catalog.systems {
            Some(v) => Some(self.resolve_container::<System>(url, v).await?),
            None => None,
        };
        let releases = match catalog.releases {
            Some(v) => Some(self.resolve_releases(url, v).await?),
            None => None,
        };

        Ok(Normalized::new(
            CatalogSnapshot {
                name: catalog.name,
                unique_name: catalog.unique_name,
                version: catalog.version,
                cores,
                systems,
                releases,
            },
            Some(url.to_string()),
            None,
        ))
    }
}

fn join(base: &Url, reference: &str) -> Result<Url, RemoteError> {
    base.join(reference)
        .map_err(|e| RemoteError::url(reference, e))
}

fn provenance_url<T>(value: &Normalized<T>, fallback: &Url) -> Result<Url, RemoteError> {
    match &value.url {
        Some(u) => Url::parse(u).map_err(|e| RemoteError::url(u.as_str(), e)),
        None => Ok(fallback.clone()),
    }
}

/// Parse a user-supplied catalog location, assuming `https://` when no scheme
/// is given.
pub fn parse_catalog_url(input: &str) -> Result<Url, RemoteError> {
    let input = input.trim();
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    Url::parse(&with_scheme).map_err(|e| RemoteError::url(input, e))
}

/// The next location to try after fetching the catalog at `url` failed.
pub fn fallback_url(url: &Url) -> Option<Url> {
    let path = url.path();
    let is_catalog_file = path
        .rsplit('/')
        .next()
        .is_some_and(|last| last == CATALOG_FILE);
    if !is_catalog_file {
        let mut next = url.clone();
        let trimmed = path.trim_end_matches('/');
        next.set_path(&format!("{trimmed}/{CATALOG_FILE}"));
        return Some(next);
    }
    if url.scheme() == "http" {
        let mut next = url.clone();
        next.set_scheme("https").ok()?;
        return Some(next);
    }
    None
}

/// Fetch and normalize the catalog at a user-supplied location, trying the
/// fallback locations in turn.
pub async fn fetch_and_normalize_catalog<R: Remote, P: RetryPrompt>(
    remote: &R,
    prompt: &mut P,
    url: &str,
) -> Result<Outcome<NormalizedCatalog>, RemoteError> {
    let mut url = parse_catalog_url(url)?;
    let mut normalizer = Normalizer::new(remote, prompt);
    loop {
        match normalizer.resolve_catalog(&url).await {
            Ok(catalog) => return Ok(Outcome::Completed(catalog)),
            Err(RemoteError::Cancelled) => return Ok(Outcome::Cancelled),
            Err(e) if !e.allows_fallback() => return Err(e),
            Err(e) => match fallback_url(&url) {
                Some(next) => {
                    log::warn!("Fetching catalog at {url} failed ({e}), trying {next}");
                    url = next;
                }
                None => return Err(e),
            },
        }
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
