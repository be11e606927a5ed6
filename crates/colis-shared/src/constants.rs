/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Random salt mixed into the key derivation, in bytes
pub const SALT_SIZE: usize = 32;

/// Attachment secret (input key material) size in bytes
pub const SECRET_SIZE: usize = 32;

/// BLAKE3 digest size in bytes
pub const DIGEST_SIZE: usize = 32;

/// Key derivation context (BLAKE3)
pub const KDF_CONTEXT_ATTACHMENT_KEY: &str = "colis-attachment-key-v1";

/// Version byte leading every framed attachment
pub const FRAME_VERSION: u8 = 0x01;

/// Version byte leading every serialized `EncodedContent`
pub const WIRE_VERSION: u8 = 0x01;

/// Authority for the content types defined here
pub const CONTENT_TYPE_AUTHORITY: &str = "colis.dev";

/// Content type name of an inline attachment
pub const ATTACHMENT_TYPE_ID: &str = "attachment";

/// Content type name of a remote attachment pointer
pub const REMOTE_ATTACHMENT_TYPE_ID: &str = "remoteAttachment";

/// Practical ceiling for inline attachments (1 MiB).
///
/// Guidance for callers picking a path. The inline codec never checks it;
/// the messaging transport is what actually limits message size.
pub const INLINE_SIZE_HINT: usize = 1024 * 1024;

/// Scheme remote pointers use unless told otherwise
pub const DEFAULT_SCHEME: &str = "https://";
