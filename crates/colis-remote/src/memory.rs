use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tokio::sync::RwLock;
use tracing::debug;

use colis_shared::{Digest, FetchError};

use crate::fetch::{parse_url, Fetcher, Uploader};

/// In-memory blob store serving one base URL. Meant for tests and local
/// tooling; it serves back exactly what was uploaded unless told otherwise.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    base_url: Url,
    blobs: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
    /// `base_url` should end with a `/`; blobs live at `{base_url}{digest}`.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let mut base_url = parse_url(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            blobs: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn insert(&self, url: &Url, data: impl Into<Bytes>) {
        self.blobs.write().await.insert(url.to_string(), data.into());
    }

    pub async fn remove(&self, url: &Url) -> bool {
        self.blobs.write().await.remove(url.as_str()).is_some()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// Flip bit `bit % 8` of byte `bit / 8` in the stored blob. Returns
    /// `false` if there is nothing to corrupt at that URL or offset.
    pub async fn corrupt(&self, url: &Url, bit: usize) -> bool {
        let mut blobs = self.blobs.write().await;
        let Some(stored) = blobs.get_mut(url.as_str()) else {
            return false;
        };
        let index = bit / 8;
        if index >= stored.len() {
            return false;
        }
        let mut bytes = stored.to_vec();
        bytes[index] ^= 1 << (bit % 8);
        *stored = Bytes::from(bytes);
        true
    }
}

#[async_trait]
impl Fetcher for MemoryStore {
    fn supports(&self, scheme: &str) -> bool {
        self.base_url.scheme() == scheme
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let blobs = self.blobs.read().await;
        let data = blobs
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))?;

        debug!(url = %url, size = data.len(), "Served blob from memory");
        Ok(data)
    }
}

#[async_trait]
impl Uploader for MemoryStore {
    async fn upload(&self, ciphertext: Bytes, digest: &Digest) -> Result<Url, FetchError> {
        let url = self
            .base_url
            .join(&digest.to_hex())
            .map_err(|e| FetchError::Upload(e.to_string()))?;
        self.insert(&url, ciphertext).await;
        Ok(url)
    }
}
