//! HTTP(S) blob storage over reqwest.
//!
//! `HttpFetcher` works against any host that serves the exact uploaded bytes
//! on GET. `HttpUploader` speaks the `colis-server` upload API:
//! `PUT {base}/blob` with the raw ciphertext, answered by
//! `{"digest": "<hex>", "size": <n>}`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{header, Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

use colis_shared::{Digest, FetchError};

use crate::config::FetchConfig;
use crate::fetch::{parse_url, Fetcher, Uploader};

fn build_client(config: &FetchConfig) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))
}

fn map_transport(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
    allow_http: bool,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config)?,
            timeout: config.timeout,
            max_bytes: config.max_bytes,
            allow_http: config.allow_http,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn supports(&self, scheme: &str) -> bool {
        scheme == "https" || (self.allow_http && scheme == "http")
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let mut resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_transport(e, self.timeout))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(declared) = resp.content_length() {
            if declared > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size: declared,
                    max: self.max_bytes,
                });
            }
        }

        // Content-Length may be absent or wrong, so cap while streaming too.
        let mut body = BytesMut::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| map_transport(e, self.timeout))?
        {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size,
                    max: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, size = body.len(), "Fetched blob");
        Ok(body.freeze())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    digest: String,
    size: u64,
    /// Public fetch URL, sent by hosts that know their external address.
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpUploader {
    /// `base_url` is the storage host root, e.g. `https://blobs.example/`.
    pub fn new(base_url: &str, config: &FetchConfig) -> Result<Self, FetchError> {
        let mut base_url = parse_url(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: build_client(config)?,
            base_url,
            timeout: config.timeout,
        })
    }

    fn join(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::Upload(format!("Invalid upload URL: {e}")))
    }

    /// The host's advertised URL wins, as long as it still names the blob
    /// by its digest. Otherwise fall back to `{base}/blob/{digest}`.
    fn fetch_url(&self, advertised: Option<&str>, digest: &Digest) -> Result<Url, FetchError> {
        let hex = digest.to_hex();
        let Some(raw) = advertised else {
            return self.join(&format!("blob/{hex}"));
        };

        let url = Url::parse(raw)
            .map_err(|e| FetchError::Upload(format!("Invalid advertised URL '{raw}': {e}")))?;
        let last = url.path_segments().and_then(|mut s| s.next_back());
        if last != Some(hex.as_str()) {
            return Err(FetchError::Upload(format!(
                "Advertised URL '{raw}' does not name blob {digest}"
            )));
        }
        Ok(url)
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, ciphertext: Bytes, digest: &Digest) -> Result<Url, FetchError> {
        let size = ciphertext.len();
        let resp = self
            .client
            .put(self.join("blob")?)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(ciphertext)
            .send()
            .await
            .map_err(|e| map_transport(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Upload(format!("Storage responded {status}")));
        }

        let stored: UploadResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Upload(format!("Invalid upload response: {e}")))?;

        if stored.digest != digest.to_hex() || stored.size != size as u64 {
            return Err(FetchError::Upload(format!(
                "Storage acknowledged {} ({} bytes), expected {} ({} bytes)",
                stored.digest, stored.size, digest, size
            )));
        }

        let url = self.fetch_url(stored.url.as_deref(), digest)?;
        info!(url = %url, size, "Blob uploaded");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_only_by_default() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        assert!(fetcher.supports("https"));
        assert!(!fetcher.supports("http"));
        assert!(!fetcher.supports("ftp"));
    }

    #[test]
    fn test_http_opt_in() {
        let fetcher = HttpFetcher::new(&FetchConfig::default().with_allow_http(true)).unwrap();
        assert!(fetcher.supports("http"));
    }

    #[test]
    fn test_advertised_url_preferred() {
        let uploader = HttpUploader::new("http://127.0.0.1:8080", &FetchConfig::default())
            .unwrap();
        let digest = colis_shared::crypto::digest(b"ciphertext");
        let hex = digest.to_hex();

        let fallback = uploader.fetch_url(None, &digest).unwrap();
        assert_eq!(fallback.as_str(), format!("http://127.0.0.1:8080/blob/{hex}"));

        let public = format!("https://blobs.example/blob/{hex}");
        let advertised = uploader.fetch_url(Some(&public), &digest).unwrap();
        assert_eq!(advertised.as_str(), public);

        assert!(matches!(
            uploader.fetch_url(Some("https://blobs.example/blob/other"), &digest),
            Err(FetchError::Upload(_))
        ));
        assert!(matches!(
            uploader.fetch_url(Some("not a url"), &digest),
            Err(FetchError::Upload(_))
        ));
    }

    #[test]
    fn test_uploader_normalizes_base() {
        let uploader = HttpUploader::new("https://blobs.example/colis", &FetchConfig::default())
            .unwrap();
        assert_eq!(
            uploader.join("blob").unwrap().as_str(),
            "https://blobs.example/colis/blob"
        );
    }
}
