//! AES-256-GCM encryption for OAuth credentials at rest.
//!
//! Values are stored as base64(nonce ∥ ciphertext) with a fresh 12-byte
//! nonce per write.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rand::rngs::OsRng;

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid encryption key format (expected base64 of 32 bytes)")]
    InvalidKeyFormat,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid encrypted data format")]
    InvalidDataFormat,
}

#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("cipher", &"<redacted>")
            .finish()
    }
}

impl TokenCipher {
    /// Build a cipher from a base64-encoded 32-byte key.
    pub fn from_key(key_b64: &str) -> Result<Self, CryptoError> {
        let key_bytes = BASE64
            .decode(key_b64.trim().as_bytes())
            .map_err(|_| CryptoError::InvalidKeyFormat)?;
        let cipher =
            Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| CryptoError::InvalidKeyFormat)?;
        Ok(Self { cipher })
    }

    /// Generate a new random key, base64-encoded.
    pub fn generate_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    #[allow(deprecated)]
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(combined))
    }

    #[allow(deprecated)]
    pub fn decrypt(&self, encrypted: &str) -> Result<String, CryptoError> {
        let combined = BASE64
            .decode(encrypted.as_bytes())
            .map_err(|_| CryptoError::InvalidDataFormat)?;
        if combined.len() < NONCE_LEN {
            return Err(CryptoError::InvalidDataFormat);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed("invalid UTF-8".into()))
    }
}
