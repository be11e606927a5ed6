//! Remote (large path) pointer record.
//!
//! The ciphertext lives at `url`; only this pointer travels through the
//! message channel. Wire form is an `EncodedContent` whose `content` is the
//! UTF-8 URL and whose parameters carry `contentDigest`, `salt`, `nonce`,
//! `secret` (hex), `scheme`, `filename` and an optional `contentLength`.

use zeroize::Zeroizing;

use crate::attachment::frame;
use crate::constants::{NONCE_SIZE, SALT_SIZE};
use crate::content::{attachment_fallback, ContentCodec};
use crate::crypto::{self, EncryptedPayload};
use crate::error::{DecodeError, Result};
use crate::protocol::{ContentTypeId, EncodedContent};
use crate::types::{Attachment, Digest, Secret};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAttachmentPointer {
    pub url: String,
    pub content_digest: Digest,
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    pub secret: Secret,
    /// Scheme the fetch must use, e.g. `https://`
    pub scheme: String,
    pub filename: String,
    /// Declared size, for progress display only. Never an integrity check.
    pub content_length: Option<u64>,
}

impl RemoteAttachmentPointer {
    /// Scheme name without the `://` suffix, e.g. `https`.
    pub fn scheme_name(&self) -> &str {
        self.scheme.trim_end_matches("://")
    }

    /// Pair fetched ciphertext with the decryption parameters carried here.
    pub fn payload_with(&self, ciphertext: Vec<u8>) -> EncryptedPayload {
        EncryptedPayload {
            ciphertext,
            salt: self.salt,
            nonce: self.nonce,
            digest: self.content_digest,
            secret: self.secret.clone(),
        }
    }
}

/// Frame and encrypt an attachment for external storage. Same byte layout
/// as the inline path.
pub fn encode_encrypted(attachment: &Attachment) -> Result<EncryptedPayload> {
    let framed = Zeroizing::new(frame(attachment)?);
    Ok(crypto::encrypt(&framed)?)
}

/// Assemble a pointer once the ciphertext has an address. No I/O.
pub fn build_pointer(
    payload: &EncryptedPayload,
    url: impl Into<String>,
    scheme: impl Into<String>,
    filename: impl Into<String>,
    content_length: Option<u64>,
) -> RemoteAttachmentPointer {
    RemoteAttachmentPointer {
        url: url.into(),
        content_digest: payload.digest,
        salt: payload.salt,
        nonce: payload.nonce,
        secret: payload.secret.clone(),
        scheme: scheme.into(),
        filename: filename.into(),
        content_length,
    }
}

/// Converts pointers to and from their wire record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemotePointerCodec;

impl ContentCodec for RemotePointerCodec {
    type Content = RemoteAttachmentPointer;

    fn content_type(&self) -> ContentTypeId {
        ContentTypeId::remote_attachment()
    }

    fn encode_content(&self, pointer: &RemoteAttachmentPointer) -> Result<EncodedContent> {
        let mut encoded = EncodedContent::new(self.content_type(), pointer.url.as_bytes().to_vec());
        encoded.set_param("contentDigest", pointer.content_digest.to_hex());
        encoded.set_param("salt", hex::encode(pointer.salt));
        encoded.set_param("nonce", hex::encode(pointer.nonce));
        encoded.set_param("secret", pointer.secret.to_hex());
        encoded.set_param("scheme", pointer.scheme.as_str());
        encoded.set_param("filename", pointer.filename.as_str());
        if let Some(len) = pointer.content_length {
            encoded.set_param("contentLength", len.to_string());
        }
        encoded.fallback = self.fallback(pointer);
        Ok(encoded)
    }

    fn decode_content(&self, encoded: &EncodedContent) -> Result<RemoteAttachmentPointer> {
        encoded.expect_type(&self.content_type())?;

        let url = std::str::from_utf8(&encoded.content)
            .map_err(|_| DecodeError::InvalidUtf8("url"))?
            .to_string();

        let content_length = match encoded.parameters.get("contentLength") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|e| DecodeError::InvalidParameter {
                name: "contentLength",
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(RemoteAttachmentPointer {
            url,
            content_digest: Digest(encoded.hex_param("contentDigest")?),
            salt: encoded.hex_param("salt")?,
            nonce: encoded.hex_param("nonce")?,
            secret: Secret::from_bytes(encoded.hex_param("secret")?),
            scheme: encoded.param("scheme")?.to_string(),
            filename: encoded.param("filename")?.to_string(),
            content_length,
        })
    }

    fn fallback(&self, pointer: &RemoteAttachmentPointer) -> Option<String> {
        Some(attachment_fallback(&pointer.filename))
    }
}
