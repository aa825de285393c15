//! Error types for payload encryption.

/// Errors raised while sealing or opening payloads.
///
/// None of the variants carry payload bytes.
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    /// The key material could not be used.
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// The key material has the wrong length.
    #[error("Invalid encryption key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    /// Sealing a payload failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Opening a payload failed (wrong key, tampering or truncation).
    #[error("Decryption failed: {0}")]
    Decryption(String),
}
