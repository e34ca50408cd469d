//! Update sets: which entries of a freshly fetched catalog are newer than
//! the installed one.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::*;
use crate::version::{compare, latest_of};

/// Compute the sparse catalog of entries in `latest` that are strictly newer
/// than their counterpart in `current`.
///
/// An entry with no counterpart in `current` has no version there, and a
/// missing version sorts lowest, so new entries are always part of the
/// result. Release lists are compared through [`latest_of`] on both sides.
/// The result keeps the top-level metadata of `latest` (or `current` when
/// there is nothing newer to report) and the container provenance of
/// `latest`.
pub fn diff(current: &NormalizedCatalog, latest: Option<&NormalizedCatalog>) -> NormalizedCatalog {
    let mut result = latest.unwrap_or(current).clone();
    result.cores = Some(Normalized::default());
    result.systems = Some(Normalized::default());
    result.releases = Some(Normalized::default());

    let Some(latest) = latest else {
        return result;
    };
    if compare(current, latest) != Ordering::Less {
        log::debug!(
            "Catalog {} {} is not newer than the installed {}",
            latest.unique_name,
            latest.value.version,
            current.value.version
        );
        return result;
    }

    newer_containers(&mut result, current, latest);
    log::debug!(
        "Catalog {} {}: {} cores, {} systems, {} releases newer",
        latest.unique_name,
        latest.value.version,
        result.cores.as_ref().map_or(0, |c| c.len()),
        result.systems.as_ref().map_or(0, |s| s.len()),
        result.releases.as_ref().map_or(0, |r| r.len()),
    );
    result
}

/// Fill the containers of `result` with the entries of `latest` that are
/// newer than in `current`, ignoring the top-level versions.
fn newer_containers(
    result: &mut NormalizedCatalog,
    current: &NormalizedCatalog,
    latest: &NormalizedCatalog,
) {
    result.cores = Some(newer_entries(
        current.cores.as_ref(),
        latest.cores.as_ref(),
        |l, c| compare(l, &c) == Ordering::Greater,
    ));
    result.systems = Some(newer_entries(
        current.systems.as_ref(),
        latest.systems.as_ref(),
        |l, c| compare(l, &c) == Ordering::Greater,
    ));
    result.releases = Some(newer_entries(
        current.releases.as_ref(),
        latest.releases.as_ref(),
        |l, c| {
            let l = latest_of(l);
            let c = c.and_then(|c| latest_of(c));
            compare(&l, &c) == Ordering::Greater
        },
    ));
}

fn newer_entries<T: Clone>(
    current: Option<&Normalized<BTreeMap<String, T>>>,
    latest: Option<&Normalized<BTreeMap<String, T>>>,
    is_newer: impl Fn(&T, Option<&T>) -> bool,
) -> Normalized<BTreeMap<String, T>> {
    let Some(latest) = latest else {
        return Normalized::default();
    };
    let entries = latest
        .iter()
        .filter(|&(name, entry)| is_newer(entry, current.and_then(|c| c.get(name.as_str()))))
        .map(|(name, entry)| (name.clone(), entry.clone()))
        .collect();
    Normalized::new(entries, latest.url.clone(), latest.version.clone())
}

/// Names of the entries installed out of an update set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedEntries {
    pub cores: BTreeSet<String>,
    pub systems: BTreeSet<String>,
    pub releases: BTreeSet<String>,
}

impl AppliedEntries {
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty() && self.systems.is_empty() && self.releases.is_empty()
    }
}

/// The outcome of folding an update set into the installed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Folded {
    /// The new installed snapshot.
    pub current: NormalizedCatalog,
    /// The snapshot still pending, if some updates were not applied.
    pub pending: Option<NormalizedCatalog>,
}

/// Fold the applied entries of `latest` into `current`.
///
/// Applied entries are copied over from `latest`. If that leaves nothing
/// newer in `latest`, `latest` becomes the installed snapshot as a whole and
/// nothing stays pending.
pub fn merge_applied(
    current: &NormalizedCatalog,
    latest: &NormalizedCatalog,
    applied: &AppliedEntries,
) -> Folded {
    let mut merged = current.clone();
    merged.cores = merge_container(current.cores.as_ref(), latest.cores.as_ref(), &applied.cores);
    merged.systems = merge_container(
        current.systems.as_ref(),
        latest.systems.as_ref(),
        &applied.systems,
    );
    merged.releases = merge_container(
        current.releases.as_ref(),
        latest.releases.as_ref(),
        &applied.releases,
    );

    // The merged snapshot keeps its old top-level version, so compare the
    // containers directly.
    let mut remaining = latest.clone();
    newer_containers(&mut remaining, &merged, latest);
    if remaining.is_empty() {
        log::debug!("Update of {} fully applied", latest.unique_name);
        Folded {
            current: latest.clone(),
            pending: None,
        }
    } else {
        log::debug!("Update of {} partially applied", latest.unique_name);
        Folded {
            current: merged,
            pending: Some(latest.clone()),
        }
    }
}

fn merge_container<T: Clone>(
    current: Option<&Normalized<BTreeMap<String, T>>>,
    latest: Option<&Normalized<BTreeMap<String, T>>>,
    applied: &BTreeSet<String>,
) -> Option<Normalized<BTreeMap<String, T>>> {
    let Some(latest) = latest else {
        return current.cloned();
    };
    let mut merged = current
        .cloned()
        .unwrap_or_else(|| Normalized::new(BTreeMap::new(), latest.url.clone(), latest.version.clone()));
    for name in applied {
        if let Some(entry) = latest.get(name) {
            merged.insert(name.clone(), entry.clone());
        }
    }
    Some(merged)
}

#[cfg(test)]
#[path = "tests/diff_tests.rs"]
mod tests;
