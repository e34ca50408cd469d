use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::RemoteError;
use crate::files::{create_target, discard};
use crate::remote::Remote;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("fpga-catalog/", env!("CARGO_PKG_VERSION"));

/// [`Remote`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
}

impl HttpRemote {
    pub fn new() -> Result<Self, RemoteError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, RemoteError> {
        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

impl Remote for HttpRemote {
    async fn fetch_json(&self, url: &Url) -> Result<Value, RemoteError> {
        log::debug!("GET {url}");
        let text = self.get(url).await?.text().await?;
        serde_json::from_str(&text).map_err(|source| RemoteError::Json {
            url: url.to_string(),
            source,
        })
    }

    async fn download(&self, url: &Url, dest: &Path) -> Result<PathBuf, RemoteError> {
        let mut resp = self.get(url).await?;
        let disposition = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let (path, mut file) = create_target(dest, url, disposition.as_deref()).await?;

        let written = async {
            while let Some(chunk) = resp.chunk().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<_, RemoteError>(())
        }
        .await;

        if let Err(e) = written {
            drop(file);
            discard(&path).await;
            return Err(e);
        }
        log::debug!("Saved {url} to {}", path.display());
        Ok(path)
    }
}
