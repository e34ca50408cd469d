//! Version ordering for catalog entries.
//!
//! Versions are dotted strings or plain numbers. Segments are compared
//! numerically when both parse as finite numbers and as strings otherwise.
//! A missing version sorts below every present version.

use std::cmp::Ordering;

use crate::types::*;

pub const TAG_LATEST: &str = "latest";
pub const TAG_ALPHA: &str = "alpha";
pub const TAG_BETA: &str = "beta";

/// Anything a version can be extracted from.
pub trait Versioned {
    fn version_of(&self) -> Option<String>;
}

impl Versioned for str {
    fn version_of(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl Versioned for String {
    fn version_of(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl Versioned for i64 {
    fn version_of(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl Versioned for u64 {
    fn version_of(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl Versioned for Version {
    fn version_of(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: Versioned + ?Sized> Versioned for &T {
    fn version_of(&self) -> Option<String> {
        (**self).version_of()
    }
}

impl<T: Versioned> Versioned for Option<T> {
    fn version_of(&self) -> Option<String> {
        self.as_ref().and_then(Versioned::version_of)
    }
}

impl Versioned for Release {
    fn version_of(&self) -> Option<String> {
        self.version.version_of()
    }
}

impl Versioned for Core {
    fn version_of(&self) -> Option<String> {
        None
    }
}

impl Versioned for System {
    fn version_of(&self) -> Option<String> {
        None
    }
}

impl Versioned for Catalog {
    fn version_of(&self) -> Option<String> {
        self.version.version_of()
    }
}

impl Versioned for CatalogSnapshot {
    fn version_of(&self) -> Option<String> {
        self.version.version_of()
    }
}

/// A normalized value's own version wins over the version of the reference
/// it was resolved through.
impl<T: Versioned> Versioned for Normalized<T> {
    fn version_of(&self) -> Option<String> {
        self.value.version_of().or_else(|| self.version.clone())
    }
}

/// Extract the version of `v`, if any.
pub fn version_of<V: Versioned + ?Sized>(v: &V) -> Option<String> {
    v.version_of()
}

/// Compare two versioned values.
pub fn compare<A, B>(a: &A, b: &B) -> Ordering
where
    A: Versioned + ?Sized,
    B: Versioned + ?Sized,
{
    match (a.version_of(), b.version_of()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_versions(&a, &b),
    }
}

/// Reverse of [`compare`], for sorting newest first.
pub fn compare_desc<A, B>(a: &A, b: &B) -> Ordering
where
    A: Versioned + ?Sized,
    B: Versioned + ?Sized,
{
    compare(a, b).reverse()
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut a_parts = a.split('.');
    let mut b_parts = b.split('.');
    loop {
        match (a_parts.next(), b_parts.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => match compare_segments(a, b) {
                Ordering::Equal => {}
                other => return other,
            },
        }
    }
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    match (as_finite(a), as_finite(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn as_finite(segment: &str) -> Option<f64> {
    segment
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

// ── Release selection ───────────────────────────────────────────────────────

/// Values that carry a list of tags.
pub trait Tagged {
    fn tags(&self) -> &[String];

    fn has_tag(&self, tag: &str) -> bool {
        self.tags().iter().any(|t| t == tag)
    }
}

impl Tagged for Release {
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Tagged for Core {
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl<T: Tagged> Tagged for Normalized<T> {
    fn tags(&self) -> &[String] {
        self.value.tags()
    }
}

/// The highest version in `items`; the earliest one wins a tie.
fn highest<'a, R: Versioned>(items: impl Iterator<Item = &'a R>) -> Option<&'a R> {
    items.fold(None, |best, item| match best {
        Some(b) if compare(item, b) != Ordering::Greater => Some(b),
        _ => Some(item),
    })
}

/// The highest-versioned release carrying `tag`.
pub fn latest_tagged<'a, R: Versioned + Tagged>(releases: &'a [R], tag: &str) -> Option<&'a R> {
    highest(releases.iter().filter(|r| r.has_tag(tag)))
}

/// Pick the release to install from a list.
///
/// The highest release tagged `latest`; failing that the highest release
/// not tagged `alpha` or `beta`; failing that the first release as listed.
pub fn latest_of<R: Versioned + Tagged>(releases: &[R]) -> Option<&R> {
    latest_tagged(releases, TAG_LATEST)
        .or_else(|| {
            highest(
                releases
                    .iter()
                    .filter(|r| !(r.has_tag(TAG_ALPHA) || r.has_tag(TAG_BETA))),
            )
        })
        .or_else(|| releases.first())
}

#[cfg(test)]
#[path = "tests/version_tests.rs"]
mod tests;
