// # Encrypted API key
//
// The provider credential may be supplied sealed with AES-256-GCM:
//
// ```text
// DDNS_PROVIDER_API_KEY = base64( nonce[12] || ciphertext+tag )
// DDNS_ENCRYPTION_KEY   = 32 raw bytes
// ```
//
// Decryption happens once at startup. Any failure here is a configuration
// error and the daemon exits before the first cycle.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// Why an encrypted API key could not be opened
///
/// None of the variants carry key material.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("encrypted API key is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("DDNS_ENCRYPTION_KEY must be {KEY_LEN} bytes, got {0}")]
    KeyLength(usize),

    #[error("encrypted API key is too short to contain a nonce")]
    TooShort,

    #[error("failed to decrypt API key (wrong key or corrupted ciphertext)")]
    Decrypt,

    #[error("decrypted API key is not valid UTF-8")]
    NotUtf8,
}

/// Open an API key sealed as base64(nonce || ciphertext)
pub fn decrypt_api_key(encoded: &str, key: &str) -> Result<String, SecretError> {
    let key = key.as_bytes();
    if key.len() != KEY_LEN {
        return Err(SecretError::KeyLength(key.len()));
    }

    let data = STANDARD.decode(encoded.trim())?;
    if data.len() < NONCE_LEN {
        return Err(SecretError::TooShort);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| SecretError::KeyLength(key.len()))?;
    let (nonce, ciphertext) = data.split_at(NONCE_LEN);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| SecretError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| SecretError::NotUtf8)
}
