//! The collaborators the pipeline talks to: the network, and the user when
//! the network fails.

use std::path::{Path, PathBuf};

use serde_json::Value;
use url::Url;

use crate::error::RemoteError;

/// A source of catalog documents and artifacts.
#[allow(async_fn_in_trait)]
pub trait Remote {
    /// Fetch and parse a JSON document.
    async fn fetch_json(&self, url: &Url) -> Result<Value, RemoteError>;

    /// Download `url` into the directory `dest`, returning the path written.
    ///
    /// Implementations create the file with [`crate::files::create_target`] so
    /// an existing file is never overwritten.
    async fn download(&self, url: &Url, dest: &Path) -> Result<PathBuf, RemoteError>;
}

impl<R: Remote> Remote for &R {
    async fn fetch_json(&self, url: &Url) -> Result<Value, RemoteError> {
        (**self).fetch_json(url).await
    }

    async fn download(&self, url: &Url, dest: &Path) -> Result<PathBuf, RemoteError> {
        (**self).download(url, dest).await
    }
}

/// What to do after a fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Cancel,
}

/// Asked whenever a catalog document could not be fetched.
pub trait RetryPrompt {
    fn on_fetch_error(&mut self, url: &str, error: &RemoteError) -> RetryDecision;
}

impl<F> RetryPrompt for F
where
    F: FnMut(&str, &RemoteError) -> RetryDecision,
{
    fn on_fetch_error(&mut self, url: &str, error: &RemoteError) -> RetryDecision {
        self(url, error)
    }
}

/// A prompt for unattended runs: every failure cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl RetryPrompt for NeverRetry {
    fn on_fetch_error(&mut self, url: &str, error: &RemoteError) -> RetryDecision {
        log::warn!("Fetching {url} failed: {error}");
        RetryDecision::Cancel
    }
}

/// The result of an operation the user may cancel.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> Outcome<T> {
    /// Turn the internal cancellation marker into [`Outcome::Cancelled`].
    pub fn from_result(result: Result<T, RemoteError>) -> Result<Self, RemoteError> {
        match result {
            Ok(value) => Ok(Self::Completed(value)),
            Err(RemoteError::Cancelled) => Ok(Self::Cancelled),
            Err(e) => Err(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
