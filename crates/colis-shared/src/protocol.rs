use std::collections::BTreeMap;

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ATTACHMENT_TYPE_ID, CONTENT_TYPE_AUTHORITY, REMOTE_ATTACHMENT_TYPE_ID, WIRE_VERSION,
};
use crate::error::DecodeError;
use crate::types::decode_hex_array;

/// Identifies what an `EncodedContent` carries, e.g. `colis.dev/attachment:1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentTypeId {
    pub authority: String,
    pub type_id: String,
    pub version_major: u32,
    pub version_minor: u32,
}

impl ContentTypeId {
    pub fn new(authority: &str, type_id: &str, version_major: u32, version_minor: u32) -> Self {
        Self {
            authority: authority.to_string(),
            type_id: type_id.to_string(),
            version_major,
            version_minor,
        }
    }

    pub fn attachment() -> Self {
        Self::new(CONTENT_TYPE_AUTHORITY, ATTACHMENT_TYPE_ID, 1, 0)
    }

    pub fn remote_attachment() -> Self {
        Self::new(CONTENT_TYPE_AUTHORITY, REMOTE_ATTACHMENT_TYPE_ID, 1, 0)
    }

    /// Minor versions are compatible; authority, name and major must match.
    pub fn same_type(&self, other: &ContentTypeId) -> bool {
        self.authority == other.authority
            && self.type_id == other.type_id
            && self.version_major == other.version_major
    }
}

impl std::fmt::Display for ContentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}:{}.{}",
            self.authority, self.type_id, self.version_major, self.version_minor
        )
    }
}

/// Tagged content record handed to the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedContent {
    pub type_id: ContentTypeId,
    pub parameters: BTreeMap<String, String>,
    /// Plain-text description for receivers that cannot render the content
    pub fallback: Option<String>,
    pub content: Vec<u8>,
}

// Fixed-width integers, trailing bytes rejected.
fn wire_options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

impl EncodedContent {
    pub fn new(type_id: ContentTypeId, content: Vec<u8>) -> Self {
        Self {
            type_id,
            parameters: BTreeMap::new(),
            fallback: None,
            content,
        }
    }

    /// Serialize to binary: version byte || bincode
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        let body = wire_options().serialize(self)?;
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(WIRE_VERSION);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Deserialize from binary
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let (&version, body) = data.split_first().ok_or(DecodeError::Truncated {
            field: "wire version",
            needed: 1,
            remaining: 0,
        })?;
        if version != WIRE_VERSION {
            return Err(DecodeError::UnsupportedWireVersion(version));
        }
        Ok(wire_options().deserialize(body)?)
    }

    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        self.parameters.insert(name.to_string(), value.into());
    }

    pub fn param(&self, name: &'static str) -> Result<&str, DecodeError> {
        self.parameters
            .get(name)
            .map(String::as_str)
            .ok_or(DecodeError::MissingParameter(name))
    }

    pub fn hex_param<const N: usize>(&self, name: &'static str) -> Result<[u8; N], DecodeError> {
        decode_hex_array(self.param(name)?).map_err(|e| DecodeError::InvalidParameter {
            name,
            reason: e.to_string(),
        })
    }

    /// Fail unless this record carries `expected` (minor version ignored).
    pub fn expect_type(&self, expected: &ContentTypeId) -> Result<(), DecodeError> {
        if self.type_id.same_type(expected) {
            Ok(())
        } else {
            Err(DecodeError::ContentTypeMismatch {
                expected: expected.to_string(),
                actual: self.type_id.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_display() {
        assert_eq!(
            ContentTypeId::attachment().to_string(),
            "colis.dev/attachment:1.0"
        );
        assert_eq!(
            ContentTypeId::remote_attachment().to_string(),
            "colis.dev/remoteAttachment:1.0"
        );
    }

    #[test]
    fn test_minor_version_is_compatible() {
        let newer = ContentTypeId::new(CONTENT_TYPE_AUTHORITY, ATTACHMENT_TYPE_ID, 1, 3);
        let next_major = ContentTypeId::new(CONTENT_TYPE_AUTHORITY, ATTACHMENT_TYPE_ID, 2, 0);

        assert!(ContentTypeId::attachment().same_type(&newer));
        assert!(!ContentTypeId::attachment().same_type(&next_major));
        assert!(!ContentTypeId::attachment().same_type(&ContentTypeId::remote_attachment()));
    }

    #[test]
    fn test_encoded_content_roundtrip() {
        let mut encoded = EncodedContent::new(ContentTypeId::attachment(), vec![1, 2, 3]);
        encoded.set_param("digest", "00ff");
        encoded.fallback = Some("fallback".into());

        let bytes = encoded.to_bytes().unwrap();
        assert_eq!(bytes[0], WIRE_VERSION);

        let restored = EncodedContent::from_bytes(&bytes).unwrap();
        assert_eq!(restored, encoded);
    }

    #[test]
    fn test_unknown_wire_version_rejected() {
        let mut bytes = EncodedContent::new(ContentTypeId::attachment(), vec![])
            .to_bytes()
            .unwrap();
        bytes[0] = 0x7f;

        assert!(matches!(
            EncodedContent::from_bytes(&bytes),
            Err(DecodeError::UnsupportedWireVersion(0x7f))
        ));
    }

    #[test]
    fn test_empty_and_truncated_wire_rejected() {
        assert!(matches!(
            EncodedContent::from_bytes(&[]),
            Err(DecodeError::Truncated { .. })
        ));

        let bytes = EncodedContent::new(ContentTypeId::attachment(), vec![9; 16])
            .to_bytes()
            .unwrap();
        assert!(matches!(
            EncodedContent::from_bytes(&bytes[..bytes.len() - 4]),
            Err(DecodeError::Wire(_))
        ));
    }

    #[test]
    fn test_trailing_wire_bytes_rejected() {
        let mut bytes = EncodedContent::new(ContentTypeId::attachment(), vec![])
            .to_bytes()
            .unwrap();
        bytes.push(0);

        assert!(matches!(
            EncodedContent::from_bytes(&bytes),
            Err(DecodeError::Wire(_))
        ));
    }

    #[test]
    fn test_missing_and_invalid_params() {
        let mut encoded = EncodedContent::new(ContentTypeId::attachment(), vec![]);
        assert!(matches!(
            encoded.param("salt"),
            Err(DecodeError::MissingParameter("salt"))
        ));

        encoded.set_param("salt", "abcd");
        assert!(matches!(
            encoded.hex_param::<32>("salt"),
            Err(DecodeError::InvalidParameter { name: "salt", .. })
        ));
    }

    #[test]
    fn test_expect_type_mismatch() {
        let encoded = EncodedContent::new(ContentTypeId::remote_attachment(), vec![]);
        assert!(encoded.expect_type(&ContentTypeId::remote_attachment()).is_ok());
        assert!(matches!(
            encoded.expect_type(&ContentTypeId::attachment()),
            Err(DecodeError::ContentTypeMismatch { .. })
        ));
    }
}
