use std::time::Duration;

use thiserror::Error;

use crate::types::Digest;

/// Every failure an attachment can hit between sender and receiver.
#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Integrity check failed: expected digest {expected}, got {actual}")]
    Integrity { expected: Digest, actual: Digest },

    #[error("Decryption failed: invalid ciphertext or wrong secret")]
    Decryption,

    #[error("Encryption failed")]
    Encryption,

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Field '{field}' too long to frame: {len} bytes")]
    FieldTooLong { field: &'static str, len: usize },
}

impl From<CryptoError> for AttachmentError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::EncryptionFailed => Self::Encryption,
            CryptoError::DecryptionFailed => Self::Decryption,
            CryptoError::IntegrityMismatch { expected, actual } => {
                Self::Integrity { expected, actual }
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Digest mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: Digest, actual: Digest },
}

/// Malformed framing or wire records.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Truncated {field}: need {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Unsupported frame version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unsupported wire version: {0}")]
    UnsupportedWireVersion(u8),

    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("{0} trailing bytes after attachment frame")]
    TrailingBytes(usize),

    #[error("Length of {0} does not fit in memory")]
    LengthOverflow(&'static str),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Content type mismatch: expected {expected}, got {actual}")]
    ContentTypeMismatch { expected: String, actual: String },

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Wire format error: {0}")]
    Wire(#[from] bincode::Error),
}

/// Retrieval failures on the remote path.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Scheme mismatch: pointer declares '{declared}', URL uses '{actual}'")]
    SchemeMismatch { declared: String, actual: String },

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Storage responded {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Blob too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AttachmentError>;
