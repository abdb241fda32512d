//! AES-256-GCM [`SecretCipher`].
//!
//! Stored form is `base64(nonce || ciphertext)` with a fresh 96-bit nonce per
//! value.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CredentialError;
use crate::port::outbound::secret::SecretCipher;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Build from a base64-encoded 32-byte master key.
    ///
    /// # Errors
    ///
    /// [`CredentialError::InvalidKey`] if the key is not base64 or not 32 bytes.
    pub fn from_base64(key: &str) -> Result<Self, CredentialError> {
        let bytes = STANDARD
            .decode(key.trim())
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
        if bytes.len() != KEY_LEN {
            return Err(CredentialError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(&bytes)
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CredentialError::Encrypt(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CredentialError> {
        let fail = |reason: String| CredentialError::Decrypt {
            field: "ciphertext",
            reason,
        };

        let blob = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| fail(e.to_string()))?;
        if blob.len() <= NONCE_LEN {
            return Err(fail("value too short".into()));
        }
        let (nonce, body) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| fail("authentication failed".into()))?;
        String::from_utf8(plaintext).map_err(|e| fail(e.to_string()))
    }
}
