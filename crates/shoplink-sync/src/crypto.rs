//! # Secret Cipher
//!
//! Encrypts credential fields before they reach the settings store.
//!
//! ## Envelope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  plaintext ──► ChaCha20-Poly1305(key, random 12-byte nonce)            │
//! │                                                                         │
//! │  stored  = "v1:" + base64( nonce ‖ ciphertext+tag )                    │
//! │                                                                         │
//! │  key     = 32 bytes, base64 in the env var named by [secrets].key_env  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{SyncError, SyncResult};

const ENVELOPE_PREFIX: &str = "v1:";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Symmetric cipher for secrets at rest.
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// Builds a cipher from raw key bytes.
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        SecretCipher { key }
    }

    /// Decodes a base64 key; it must be exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> SyncResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(|e| SyncError::config(format!("secret key is not valid base64: {}", e)))?;

        let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            SyncError::config(format!(
                "secret key must decode to {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;

        Ok(SecretCipher { key })
    }

    /// Reads the key from the named environment variable.
    pub fn from_env(var: &str) -> SyncResult<Self> {
        let encoded = std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                SyncError::config(format!(
                    "{} is not set; generate a key with `shoplink keygen`",
                    var
                ))
            })?;
        Self::from_base64(&encoded)
    }

    /// Generates a fresh random key, base64-encoded.
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        STANDARD.encode(key)
    }

    /// True when the value already carries the envelope prefix.
    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(ENVELOPE_PREFIX)
    }

    /// Encrypts a plaintext into the `v1:` envelope.
    pub fn encrypt(&self, plaintext: &str) -> SyncResult<String> {
        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| SyncError::config(format!("failed to initialize cipher: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = aead
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| SyncError::config(format!("failed to encrypt secret: {}", e)))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", ENVELOPE_PREFIX, STANDARD.encode(payload)))
    }

    /// Decrypts a `v1:` envelope.
    ///
    /// A wrong key, a truncated payload or a missing prefix are all
    /// configuration errors: the stored credential cannot be used.
    pub fn decrypt(&self, stored: &str) -> SyncResult<String> {
        let encoded = stored
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or_else(|| SyncError::config("stored secret is not encrypted"))?;

        let payload = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| SyncError::config(format!("stored secret is not valid base64: {}", e)))?;

        if payload.len() <= NONCE_LEN {
            return Err(SyncError::config("stored secret is truncated"));
        }
        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);

        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| SyncError::config(format!("failed to initialize cipher: {}", e)))?;
        let plaintext = aead
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| SyncError::config("stored secret cannot be decrypted with this key"))?;

        String::from_utf8(plaintext)
            .map_err(|e| SyncError::config(format!("decrypted secret is not UTF-8: {}", e)))
    }
}
