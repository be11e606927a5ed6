//! Encryption envelope shared by the inline and remote attachment paths.
//!
//! Key schedule:
//!   key = BLAKE3-derive_key("colis-attachment-key-v1", secret || salt)
//!
//! Cipher: XChaCha20-Poly1305, 24-byte random nonce, 16-byte tag, no AAD.
//! Digest: BLAKE3-256 over the ciphertext, so anyone holding only the
//! ciphertext can check integrity without the secret.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::constants::{KDF_CONTEXT_ATTACHMENT_KEY, NONCE_SIZE, SALT_SIZE, SECRET_SIZE};
use crate::error::CryptoError;
use crate::types::{Digest, Secret};

/// Ciphertext plus everything needed to check and open it.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    pub digest: Digest,
    pub secret: Secret,
}

impl std::fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("salt", &hex::encode(self.salt))
            .field("nonce", &hex::encode(self.nonce))
            .field("digest", &self.digest)
            .field("secret", &self.secret)
            .finish()
    }
}

pub fn generate_secret() -> Secret {
    let mut bytes = [0u8; SECRET_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Secret::from_bytes(bytes)
}

pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

pub fn digest(data: &[u8]) -> Digest {
    Digest(*blake3::hash(data).as_bytes())
}

// BLAKE3 KDF with domain separation
fn derive_key(secret: &Secret, salt: &[u8; SALT_SIZE]) -> Zeroizing<[u8; 32]> {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_ATTACHMENT_KEY);
    hasher.update(secret.as_bytes());
    hasher.update(salt);
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(hasher.finalize().as_bytes());
    key
}

/// Encrypt under freshly generated secret, salt and nonce.
pub fn encrypt(plaintext: &[u8]) -> Result<EncryptedPayload, CryptoError> {
    encrypt_with_secret(plaintext, &generate_secret(), &generate_salt())
}

/// Encrypt under caller-supplied key material. Only the nonce is fresh.
pub fn encrypt_with_secret(
    plaintext: &[u8],
    secret: &Secret,
    salt: &[u8; SALT_SIZE],
) -> Result<EncryptedPayload, CryptoError> {
    let key = derive_key(secret, salt);
    let cipher = XChaCha20Poly1305::new((&*key).into());
    let nonce = generate_nonce();

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(EncryptedPayload {
        digest: digest(&ciphertext),
        ciphertext,
        salt: *salt,
        nonce,
        secret: secret.clone(),
    })
}

/// Check `ciphertext` against `expected` in constant time.
pub fn verify_digest(ciphertext: &[u8], expected: &Digest) -> Result<(), CryptoError> {
    let actual = digest(ciphertext);
    if actual.ct_eq(expected) {
        Ok(())
    } else {
        Err(CryptoError::IntegrityMismatch {
            expected: *expected,
            actual,
        })
    }
}

/// Verify the digest, then authenticate and decrypt.
pub fn decrypt(payload: &EncryptedPayload) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    verify_digest(&payload.ciphertext, &payload.digest)?;

    let key = derive_key(&payload.secret, &payload.salt);
    let cipher = XChaCha20Poly1305::new((&*key).into());

    cipher
        .decrypt(XNonce::from_slice(&payload.nonce), payload.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}
