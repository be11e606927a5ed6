use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use colis_shared::{Digest, FetchError};

/// Pluggable read side of blob storage.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Retry policy, if any, belongs here and not in the codec.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Whether this fetcher can serve URLs of `scheme` (e.g. `"https"`).
    fn supports(&self, scheme: &str) -> bool;

    /// Return the exact bytes stored at `url`.
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError>;
}

/// Pluggable write side of blob storage.
///
/// The codecs never call this on their own; senders inject it when they want
/// the ciphertext stored and a pointer built in one step.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Store `ciphertext` and return the URL it can be fetched from.
    async fn upload(&self, ciphertext: Bytes, digest: &Digest) -> Result<Url, FetchError>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for std::sync::Arc<T> {
    fn supports(&self, scheme: &str) -> bool {
        (**self).supports(scheme)
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        (**self).fetch(url).await
    }
}

/// Parse a pointer URL into a `Url`, mapping failures to `FetchError`.
pub fn parse_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}
