use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use colis_shared::attachment::unframe;
use colis_shared::crypto::{self, EncryptedPayload};
use colis_shared::error::{AttachmentError, CryptoError, FetchError, Result};
use colis_shared::pointer::{self, RemoteAttachmentPointer};
use colis_shared::Attachment;

use crate::config::FetchConfig;
use crate::fetch::{parse_url, Fetcher, Uploader};

/// Large-path codec: the ciphertext lives in external storage, only a
/// pointer travels with the message.
///
/// Loads are independent of each other and hold no shared mutable state,
/// so one codec can serve any number of concurrent receivers.
#[derive(Debug, Clone)]
pub struct RemoteAttachmentCodec<F> {
    fetcher: F,
    timeout: Duration,
}

impl<F: Fetcher> RemoteAttachmentCodec<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, &FetchConfig::default())
    }

    pub fn with_config(fetcher: F, config: &FetchConfig) -> Self {
        Self {
            fetcher,
            timeout: config.timeout,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Frame and encrypt, same byte layout as the inline codec.
    pub fn encode_encrypted(&self, attachment: &Attachment) -> Result<EncryptedPayload> {
        pointer::encode_encrypted(attachment)
    }

    pub fn build_pointer(
        &self,
        payload: &EncryptedPayload,
        url: impl Into<String>,
        scheme: impl Into<String>,
        filename: impl Into<String>,
        content_length: Option<u64>,
    ) -> RemoteAttachmentPointer {
        pointer::build_pointer(payload, url, scheme, filename, content_length)
    }

    /// Encrypt, hand the ciphertext to `uploader`, and point at wherever it
    /// landed. Storage itself stays the uploader's business.
    pub async fn upload_and_point<U: Uploader + ?Sized>(
        &self,
        attachment: &Attachment,
        uploader: &U,
    ) -> Result<RemoteAttachmentPointer> {
        let payload = self.encode_encrypted(attachment)?;
        let url = uploader
            .upload(Bytes::from(payload.ciphertext.clone()), &payload.digest)
            .await?;

        let scheme = format!("{}://", url.scheme());
        info!(
            url = %url,
            digest = %payload.digest.short(),
            size = payload.ciphertext.len(),
            "Remote attachment stored"
        );

        Ok(self.build_pointer(
            &payload,
            url.as_str(),
            scheme,
            attachment.filename.as_str(),
            Some(attachment.len() as u64),
        ))
    }

    /// Fetch, verify, decrypt and unframe the attachment behind `pointer`.
    pub async fn load(&self, pointer: &RemoteAttachmentPointer) -> Result<Attachment> {
        self.load_with_cancel(pointer, &CancellationToken::new())
            .await
    }

    /// Like [`load`](Self::load), aborting with `FetchError::Cancelled` as
    /// soon as `cancel` fires.
    pub async fn load_with_cancel(
        &self,
        pointer: &RemoteAttachmentPointer,
        cancel: &CancellationToken,
    ) -> Result<Attachment> {
        let ciphertext = self.fetch_ciphertext(pointer, cancel).await?;

        // decrypt checks the digest before touching the cipher.
        let payload = pointer.payload_with(Vec::from(ciphertext));
        let plaintext = crypto::decrypt(&payload).map_err(|e| {
            match &e {
                CryptoError::IntegrityMismatch { expected, actual } => warn!(
                    url = %pointer.url,
                    expected = %expected.short(),
                    actual = %actual.short(),
                    "Remote attachment failed integrity check"
                ),
                _ => warn!(url = %pointer.url, error = %e, "Remote attachment failed to decrypt"),
            }
            AttachmentError::from(e)
        })?;
        let attachment = unframe(&plaintext)?;

        if let Some(declared) = pointer.content_length {
            if declared != attachment.len() as u64 {
                debug!(
                    declared,
                    actual = attachment.len(),
                    "Advisory content length differs from payload"
                );
            }
        }

        debug!(
            url = %pointer.url,
            filename = %attachment.filename,
            size = attachment.len(),
            "Remote attachment loaded"
        );
        Ok(attachment)
    }

    async fn fetch_ciphertext(
        &self,
        pointer: &RemoteAttachmentPointer,
        cancel: &CancellationToken,
    ) -> std::result::Result<Bytes, FetchError> {
        let url = parse_url(&pointer.url)?;

        if url.scheme() != pointer.scheme_name() {
            return Err(FetchError::SchemeMismatch {
                declared: pointer.scheme.clone(),
                actual: url.scheme().to_string(),
            });
        }
        if !self.fetcher.supports(url.scheme()) {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.fetcher.fetch(&url)) => {
                res.map_err(|_| FetchError::Timeout(self.timeout))?
            }
        }
    }
}
