//! Attachment encryption at the storage boundary.
//!
//! Payloads are sealed with AES-256-GCM. Every call draws a fresh 96-bit
//! nonce which is prepended to the output:
//!
//! ```text
//! [ nonce (12) | ciphertext (n) | tag (16) ]
//! ```
//!
//! The codec is an immutable value built once from configuration and shared
//! by reference with the storage adapter.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// AES-256 key length.
pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("attachment encryption is not configured")]
    NotConfigured,

    #[error("attachment cipher failure: {0}")]
    Crypto(String),
}

#[derive(Clone)]
pub struct AttachmentCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for AttachmentCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentCodec").finish_non_exhaustive()
    }
}

impl AttachmentCodec {
    /// Build a codec from a configured secret, see [`derive_key`].
    pub fn from_secret(secret: &str) -> Result<Self, CodecError> {
        if secret.trim().is_empty() {
            return Err(CodecError::NotConfigured);
        }
        Ok(Self::from_key(&derive_key(secret)))
    }

    pub fn from_key(key: &[u8; KEY_LEN]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CodecError::Crypto(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(CodecError::Crypto(format!(
                "ciphertext too short: {} bytes",
                data.len()
            )));
        }
        let (nonce, sealed) = data.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CodecError::Crypto("authentication failed".to_string()))
    }
}

/// Turn a configured secret into an AES-256 key.
///
/// A secret that decodes as standard base64 contributes its raw bytes,
/// anything else is hashed with SHA-256. The result is zero-padded or
/// truncated to exactly [`KEY_LEN`] bytes.
pub fn derive_key(secret: &str) -> [u8; KEY_LEN] {
    let raw = match STANDARD.decode(secret) {
        Ok(bytes) => bytes,
        Err(_) => Sha256::digest(secret.as_bytes()).to_vec(),
    };

    let mut key = [0u8; KEY_LEN];
    let n = raw.len().min(KEY_LEN);
    key[..n].copy_from_slice(&raw[..n]);
    key
}
