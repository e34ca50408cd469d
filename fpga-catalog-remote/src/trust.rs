//! Detached signature checks for downloaded artifacts.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signature, VerifyingKey};

use crate::error::RemoteError;

/// Checks a detached signature over the contents of a file.
#[allow(async_fn_in_trait)]
pub trait SignatureVerifier {
    /// `Ok(false)` means the signature is well formed but does not match.
    async fn verify_signature(&self, path: &Path, signature: &[u8]) -> Result<bool, RemoteError>;
}

impl<V: SignatureVerifier> SignatureVerifier for &V {
    async fn verify_signature(&self, path: &Path, signature: &[u8]) -> Result<bool, RemoteError> {
        (**self).verify_signature(path, signature).await
    }
}

/// `None` behaves like [`NoTrustedKey`].
impl<V: SignatureVerifier> SignatureVerifier for Option<V> {
    async fn verify_signature(&self, path: &Path, signature: &[u8]) -> Result<bool, RemoteError> {
        match self {
            Some(v) => v.verify_signature(path, signature).await,
            None => NoTrustedKey.verify_signature(path, signature).await,
        }
    }
}

/// Decode a base64 signature as it appears in a file manifest.
pub fn decode_signature(signature: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(signature.trim())
}

/// Verifies ed25519 signatures against a single trusted public key.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Parse a base64-encoded 32-byte public key.
    pub fn from_base64(key: &str) -> Result<Self, RemoteError> {
        let invalid = |reason: String| RemoteError::assertion(format!("Invalid public key: {reason}"));
        let bytes = STANDARD
            .decode(key.trim())
            .map_err(|e| invalid(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| invalid(format!("expected 32 bytes, got {}", b.len())))?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|e| invalid(e.to_string()))?;
        Ok(Self::new(key))
    }
}

impl SignatureVerifier for Ed25519Verifier {
    async fn verify_signature(&self, path: &Path, signature: &[u8]) -> Result<bool, RemoteError> {
        let signature = Signature::from_slice(signature).map_err(|e| RemoteError::Signature {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let data = tokio::fs::read(path).await?;
        Ok(self.key.verify_strict(&data, &signature).is_ok())
    }
}

/// Used when no public key is configured: any signed file is rejected, since
/// its signature cannot be checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrustedKey;

impl SignatureVerifier for NoTrustedKey {
    async fn verify_signature(&self, path: &Path, _signature: &[u8]) -> Result<bool, RemoteError> {
        Err(RemoteError::Signature {
            path: path.to_path_buf(),
            reason: "no trusted public key is configured".to_string(),
        })
    }
}
