//! Inline (small path) attachment codec.
//!
//! Frame layout, version 1, integers little-endian:
//!
//! ```text
//! u8  version (0x01)
//! u32 filename length  | filename (UTF-8)
//! u32 mime type length | mime type (UTF-8)
//! u64 data length      | data
//! ```
//!
//! The frame is encrypted as a whole, so one ciphertext carries all three
//! fields. Size is not enforced here: callers pick this path only for
//! payloads under the transport's message ceiling (see `INLINE_SIZE_HINT`).

use bytes::{Buf, BufMut};
use zeroize::Zeroizing;

use crate::constants::{FRAME_VERSION, INLINE_SIZE_HINT};
use crate::content::{attachment_fallback, ContentCodec};
use crate::crypto::{self, EncryptedPayload};
use crate::error::{AttachmentError, DecodeError, Result};
use crate::protocol::{ContentTypeId, EncodedContent};
use crate::types::{Attachment, Digest, Secret};

/// Whether a payload of `len` bytes is reasonable to send inline.
pub fn fits_inline(len: usize) -> bool {
    len <= INLINE_SIZE_HINT
}

fn field_len_u32(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| AttachmentError::FieldTooLong { field, len })
}

/// Serialize an attachment into its versioned frame.
pub fn frame(attachment: &Attachment) -> Result<Vec<u8>> {
    let filename = attachment.filename.as_bytes();
    let mime_type = attachment.mime_type.as_bytes();

    let mut out =
        Vec::with_capacity(1 + 4 + filename.len() + 4 + mime_type.len() + 8 + attachment.len());
    out.put_u8(FRAME_VERSION);
    out.put_u32_le(field_len_u32("filename", filename.len())?);
    out.put_slice(filename);
    out.put_u32_le(field_len_u32("mime type", mime_type.len())?);
    out.put_slice(mime_type);
    out.put_u64_le(attachment.len() as u64);
    out.put_slice(&attachment.data);
    Ok(out)
}

fn ensure_remaining(
    buf: &[u8],
    field: &'static str,
    needed: usize,
) -> std::result::Result<(), DecodeError> {
    if buf.remaining() < needed {
        return Err(DecodeError::Truncated {
            field,
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

fn take_bytes<'a>(
    buf: &mut &'a [u8],
    field: &'static str,
    len: usize,
) -> std::result::Result<&'a [u8], DecodeError> {
    let rest: &'a [u8] = *buf;
    ensure_remaining(rest, field, len)?;
    let (head, tail) = rest.split_at(len);
    *buf = tail;
    Ok(head)
}

fn take_string(buf: &mut &[u8], field: &'static str) -> std::result::Result<String, DecodeError> {
    ensure_remaining(*buf, field, 4)?;
    let len = buf.get_u32_le() as usize;
    let bytes = take_bytes(buf, field, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(field))
}

/// Parse a frame produced by [`frame`]. Anything but an exact frame fails.
pub fn unframe(data: &[u8]) -> std::result::Result<Attachment, DecodeError> {
    let mut buf = data;

    ensure_remaining(buf, "version", 1)?;
    let version = buf.get_u8();
    if version != FRAME_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let filename = take_string(&mut buf, "filename")?;
    let mime_type = take_string(&mut buf, "mime type")?;

    ensure_remaining(buf, "data length", 8)?;
    let data_len =
        usize::try_from(buf.get_u64_le()).map_err(|_| DecodeError::LengthOverflow("data"))?;
    let payload = take_bytes(&mut buf, "data", data_len)?.to_vec();

    if buf.has_remaining() {
        return Err(DecodeError::TrailingBytes(buf.remaining()));
    }

    Ok(Attachment {
        filename,
        mime_type,
        data: payload,
    })
}

/// Encrypts an attachment as a single envelope meant to travel inside
/// the message itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachmentCodec;

impl AttachmentCodec {
    pub fn encode(&self, attachment: &Attachment) -> Result<EncryptedPayload> {
        let framed = Zeroizing::new(frame(attachment)?);
        Ok(crypto::encrypt(&framed)?)
    }

    /// Authentication failures abort before the frame is parsed.
    pub fn decode(&self, payload: &EncryptedPayload) -> Result<Attachment> {
        let plaintext = crypto::decrypt(payload)?;
        Ok(unframe(&plaintext)?)
    }
}

impl ContentCodec for AttachmentCodec {
    type Content = Attachment;

    fn content_type(&self) -> ContentTypeId {
        ContentTypeId::attachment()
    }

    fn encode_content(&self, attachment: &Attachment) -> Result<EncodedContent> {
        let payload = self.encode(attachment)?;

        let mut encoded = EncodedContent::new(self.content_type(), Vec::new());
        encoded.set_param("digest", payload.digest.to_hex());
        encoded.set_param("salt", hex::encode(payload.salt));
        encoded.set_param("nonce", hex::encode(payload.nonce));
        encoded.set_param("secret", payload.secret.to_hex());
        encoded.fallback = self.fallback(attachment);
        encoded.content = payload.ciphertext;
        Ok(encoded)
    }

    fn decode_content(&self, encoded: &EncodedContent) -> Result<Attachment> {
        encoded.expect_type(&self.content_type())?;

        let payload = EncryptedPayload {
            ciphertext: encoded.content.clone(),
            salt: encoded.hex_param("salt")?,
            nonce: encoded.hex_param("nonce")?,
            digest: Digest(encoded.hex_param("digest")?),
            secret: Secret::from_bytes(encoded.hex_param("secret")?),
        };
        self.decode(&payload)
    }

    fn fallback(&self, attachment: &Attachment) -> Option<String> {
        Some(attachment_fallback(&attachment.filename))
    }
}
