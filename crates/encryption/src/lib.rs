//! Encryption capability for secrets stored outside the process.
//!
//! The GitHub App subsystem keeps two kinds of secrets outside of memory: app
//! credentials held by the store and installation access tokens held by the
//! shared token cache. Both accept an optional [`EncryptionKey`]; when one is
//! configured payloads are sealed before they leave the process and opened
//! again on the way back in.
//!
//! [`AesGcmKey`] is the provided implementation. It uses AES-256-GCM with a
//! random 96-bit nonce per message, stored as a prefix of the ciphertext.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use std::sync::Arc;
use tracing::debug;

pub mod errors;
pub use errors::EncryptionError;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A symmetric key able to seal and open opaque payloads.
///
/// Implementations must be thread-safe. Neither method may log or embed the
/// payload in its error.
#[async_trait]
pub trait EncryptionKey: Send + Sync {
    /// Encrypts `plaintext`, returning a self-contained ciphertext.
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError>;

    /// Decrypts a ciphertext previously produced by [`EncryptionKey::encrypt`].
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError>;
}

/// AES-256-GCM key.
#[derive(Clone)]
pub struct AesGcmKey {
    key: [u8; KEY_SIZE],
}

impl AesGcmKey {
    /// Creates a key from raw bytes.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Creates a key from a standard base64 string encoding exactly
    /// [`KEY_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `EncryptionError::InvalidKey` if the string is not valid base64
    /// or decodes to the wrong number of bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, EncryptionError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| EncryptionError::InvalidKey(format!("invalid base64: {e}")))?;

        let key: [u8; KEY_SIZE] =
            raw.as_slice()
                .try_into()
                .map_err(|_| EncryptionError::InvalidKeySize {
                    expected: KEY_SIZE,
                    actual: raw.len(),
                })?;

        Ok(Self { key })
    }

    /// Generates a random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }
}

impl std::fmt::Debug for AesGcmKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmKey")
            .field("key", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl EncryptionKey for AesGcmKey {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| EncryptionError::Encryption(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if ciphertext.len() < NONCE_SIZE {
            debug!(
                length = ciphertext.len(),
                "Ciphertext shorter than nonce, refusing to decrypt"
            );
            return Err(EncryptionError::Decryption(
                "ciphertext is truncated".to_string(),
            ));
        }

        let (nonce, body) = ciphertext.split_at(NONCE_SIZE);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|e| EncryptionError::Decryption(e.to_string()))
    }
}

/// An optional [`EncryptionKey`].
///
/// Call sites that store secrets hold a `Cipher` rather than an
/// `Option<key>`, so "no key configured" means plaintext in exactly one place.
#[derive(Clone, Default)]
pub struct Cipher {
    key: Option<Arc<dyn EncryptionKey>>,
}

impl Cipher {
    /// A cipher that passes payloads through unchanged.
    pub fn plaintext() -> Self {
        Self { key: None }
    }

    /// A cipher that seals payloads with `key`.
    pub fn new(key: Arc<dyn EncryptionKey>) -> Self {
        Self { key: Some(key) }
    }

    /// A cipher from an optionally configured key.
    pub fn from_option(key: Option<Arc<dyn EncryptionKey>>) -> Self {
        Self { key }
    }

    /// Whether payloads are actually encrypted.
    pub fn is_encrypting(&self) -> bool {
        self.key.is_some()
    }

    /// Encrypts `plaintext` if a key is configured, otherwise returns it as is.
    pub async fn seal(&self, plaintext: Vec<u8>) -> Result<Vec<u8>, EncryptionError> {
        match &self.key {
            Some(key) => key.encrypt(&plaintext).await,
            None => Ok(plaintext),
        }
    }

    /// Decrypts `payload` if a key is configured, otherwise returns it as is.
    pub async fn open(&self, payload: Vec<u8>) -> Result<Vec<u8>, EncryptionError> {
        match &self.key {
            Some(key) => key.decrypt(&payload).await,
            None => Ok(payload),
        }
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("encrypting", &self.is_encrypting())
            .finish()
    }
}
