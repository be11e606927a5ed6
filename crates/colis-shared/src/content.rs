use crate::attachment::AttachmentCodec;
use crate::error::{DecodeError, Result};
use crate::pointer::{RemoteAttachmentPointer, RemotePointerCodec};
use crate::protocol::{ContentTypeId, EncodedContent};
use crate::types::Attachment;

/// A content codec each host environment can implement on its own:
/// one content type, its encode/decode pair, and a plain-text fallback.
pub trait ContentCodec {
    type Content;

    fn content_type(&self) -> ContentTypeId;

    fn encode_content(&self, content: &Self::Content) -> Result<EncodedContent>;

    fn decode_content(&self, encoded: &EncodedContent) -> Result<Self::Content>;

    fn fallback(&self, content: &Self::Content) -> Option<String>;
}

pub fn attachment_fallback(filename: &str) -> String {
    format!("Can't display \"{filename}\". This app doesn't support attachments.")
}

/// What a receiver gets after dispatching on the content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedContent {
    /// Inline attachment, already decrypted
    Attachment(Attachment),
    /// Pointer to externally stored ciphertext, still to be loaded
    RemoteAttachment(RemoteAttachmentPointer),
}

impl DecodedContent {
    /// Route by content type. Unknown types fail with
    /// `DecodeError::UnsupportedContentType`; show `encoded.fallback` instead.
    pub fn from_encoded(encoded: &EncodedContent) -> Result<Self> {
        let type_id = &encoded.type_id;

        if type_id.same_type(&ContentTypeId::attachment()) {
            AttachmentCodec
                .decode_content(encoded)
                .map(DecodedContent::Attachment)
        } else if type_id.same_type(&ContentTypeId::remote_attachment()) {
            RemotePointerCodec
                .decode_content(encoded)
                .map(DecodedContent::RemoteAttachment)
        } else {
            Err(DecodeError::UnsupportedContentType(type_id.to_string()).into())
        }
    }

    /// Decode straight from the bytes the messaging channel delivered.
    pub fn from_wire(data: &[u8]) -> Result<Self> {
        let encoded = EncodedContent::from_bytes(data)?;
        Self::from_encoded(&encoded)
    }
}
