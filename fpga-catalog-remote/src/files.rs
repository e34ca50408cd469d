//! Verified downloads.
//!
//! An artifact is only ever handed back once its size, SHA-256 and (when the
//! manifest declares one) signature have been checked. Anything that fails a
//! check is deleted.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fpga_catalog_core::File;
use tokio::fs::OpenOptions;
use url::Url;

use crate::error::{IntegrityCheck, RemoteError};
use crate::hasher::{file_size, sha256_file};
use crate::remote::Remote;
use crate::trust::{SignatureVerifier, decode_signature};

/// Extract `filename=` from a `Content-Disposition` header value.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        sanitize(value)
    })
}

/// The last non-empty path segment of `url`.
pub fn url_filename(url: &Url) -> Option<String> {
    url.path_segments()?
        .rev()
        .find(|s| !s.is_empty())
        .and_then(sanitize)
}

/// Server-supplied names must stay inside the destination directory.
fn sanitize(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

fn generated_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("download-{nanos:x}")
}

/// Create a new file in `dir` for `name`, trying `name`, then `stem-1.ext`,
/// `stem-2.ext`, ... Each candidate is created with `create_new`, so
/// concurrent downloads into one directory never end up sharing a path.
pub async fn create_unique(dir: &Path, name: &str) -> std::io::Result<(PathBuf, tokio::fs::File)> {
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = as_path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 0u32;
    loop {
        let candidate = match (n, &ext) {
            (0, _) => dir.join(name),
            (n, Some(ext)) => dir.join(format!("{stem}-{n}.{ext}")),
            (n, None) => dir.join(format!("{stem}-{n}")),
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// The file a download of `url` into `dest` should be written to.
pub async fn create_target(
    dest: &Path,
    url: &Url,
    content_disposition: Option<&str>,
) -> std::io::Result<(PathBuf, tokio::fs::File)> {
    let name = content_disposition
        .and_then(content_disposition_filename)
        .or_else(|| url_filename(url))
        .unwrap_or_else(generated_name);
    create_unique(dest, &name).await
}

/// Delete a rejected or abandoned artifact, logging rather than failing.
pub async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {e}", path.display());
        }
    }
}

/// Download `url` into `dest` without checking it.
pub async fn download_artifact<R: Remote>(
    remote: &R,
    url: &Url,
    dest: &Path,
) -> Result<PathBuf, RemoteError> {
    tokio::fs::create_dir_all(dest).await?;
    log::debug!("Downloading {url} into {}", dest.display());
    remote.download(url, dest).await
}

/// Check a downloaded artifact against its manifest. The artifact is deleted
/// when a check fails.
pub async fn check_artifact<V: SignatureVerifier>(
    verifier: &V,
    file: &File,
    path: &Path,
) -> Result<(), RemoteError> {
    let result = verify(verifier, file, path).await;
    if let Err(e) = &result {
        log::warn!("Rejecting {}: {e}", path.display());
        discard(path).await;
    }
    result
}

async fn verify<V: SignatureVerifier>(
    verifier: &V,
    file: &File,
    path: &Path,
) -> Result<(), RemoteError> {
    let (size, sha256) = tokio::try_join!(file_size(path), sha256_file(path))?;

    if size != file.size {
        return Err(RemoteError::Integrity {
            path: path.to_path_buf(),
            check: IntegrityCheck::Size,
            expected: file.size.to_string(),
            actual: size.to_string(),
        });
    }
    if !sha256.eq_ignore_ascii_case(&file.sha256) {
        return Err(RemoteError::Integrity {
            path: path.to_path_buf(),
            check: IntegrityCheck::Sha256,
            expected: file.sha256.to_lowercase(),
            actual: sha256,
        });
    }

    if let Some(signature) = &file.signature {
        let bytes = decode_signature(signature).map_err(|e| RemoteError::Signature {
            path: path.to_path_buf(),
            reason: format!("signature is not valid base64: {e}"),
        })?;
        if !verifier.verify_signature(path, &bytes).await? {
            return Err(RemoteError::Signature {
                path: path.to_path_buf(),
                reason: "signature does not match".to_string(),
            });
        }
    }
    Ok(())
}

/// Download `url` into `dest` and return the path only if it matches `file`.
pub async fn download_and_check<R: Remote, V: SignatureVerifier>(
    remote: &R,
    verifier: &V,
    url: &Url,
    file: &File,
    dest: &Path,
) -> Result<PathBuf, RemoteError> {
    let path = download_artifact(remote, url, dest).await?;
    check_artifact(verifier, file, &path).await?;
    Ok(path)
}
