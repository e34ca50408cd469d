use std::fmt;
use std::path::PathBuf;

use fpga_catalog_core::ValidationError;

/// Which manifest check an artifact failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityCheck {
    Size,
    Sha256,
}

impl fmt::Display for IntegrityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size => write!(f, "size"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Coarse classification used to decide whether an error may be retried or
/// may trigger a fallback URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Validation,
    Integrity,
    Signature,
    Assertion,
    Cancelled,
    Io,
    Store,
}

/// Errors that can occur while fetching, verifying or installing catalog content.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Invalid JSON from {url}: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },

    #[error("Integrity check failed for {}: {check} expected {expected}, got {actual}", path.display())]
    Integrity {
        path: PathBuf,
        check: IntegrityCheck,
        expected: String,
        actual: String,
    },

    #[error("Signature check failed for {}: {reason}", path.display())]
    Signature { path: PathBuf, reason: String },

    #[error("{0}")]
    Assertion(String),

    #[error("Cancelled")]
    Cancelled,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid URL {url:?}: {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(Box<dyn std::error::Error + Send + Sync>),

    #[error("Stored snapshot is not valid JSON: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl RemoteError {
    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::Assertion(msg.into())
    }

    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::Url {
            url: url.into(),
            source,
        }
    }

    pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(e))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Status { .. } | Self::Network { .. } | Self::Json { .. } => {
                ErrorKind::Transport
            }
            Self::Validation(_) | Self::Url { .. } => ErrorKind::Validation,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Signature { .. } => ErrorKind::Signature,
            Self::Assertion(_) => ErrorKind::Assertion,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Io,
            Self::Store(_) | Self::Snapshot(_) => ErrorKind::Store,
        }
    }

    /// Transport failures are the only ones worth asking the user about.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Whether a failed catalog fetch may be retried at a fallback URL.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Validation | ErrorKind::Cancelled)
    }
}
