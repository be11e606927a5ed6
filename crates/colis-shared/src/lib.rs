//! # colis-shared
//!
//! Attachment envelope and codecs for the colis attachment transport.
//!
//! Everything in this crate is pure: framing, encryption, digests and the
//! wire records handed to the messaging channel. Fetching remote
//! ciphertext lives in `colis-remote`.

pub mod attachment;
pub mod constants;
pub mod content;
pub mod crypto;
pub mod error;
pub mod pointer;
pub mod protocol;
pub mod types;

pub use attachment::{fits_inline, frame, unframe, AttachmentCodec};
pub use content::{ContentCodec, DecodedContent};
pub use crypto::EncryptedPayload;
pub use error::{AttachmentError, CryptoError, DecodeError, FetchError};
pub use pointer::{build_pointer, encode_encrypted, RemoteAttachmentPointer, RemotePointerCodec};
pub use protocol::{ContentTypeId, EncodedContent};
pub use types::{Attachment, Digest, Secret};
