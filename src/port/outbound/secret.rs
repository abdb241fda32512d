//! Credential encryption port.

use crate::domain::{Account, ApiCredentials};
use crate::error::CredentialError;

/// Symmetric cipher for credentials stored at rest.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CredentialError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, CredentialError>;
}

/// Decrypt an account's stored credentials.
///
/// # Errors
///
/// [`CredentialError::Missing`] if any field is absent, or the cipher's error
/// if a field does not decrypt.
pub fn decrypt_credentials(
    cipher: &dyn SecretCipher,
    account: &Account,
) -> Result<ApiCredentials, CredentialError> {
    let missing = || CredentialError::Missing {
        account_id: account.id.get(),
    };
    let key = account.api_key.as_deref().ok_or_else(missing)?;
    let secret = account.api_secret.as_deref().ok_or_else(missing)?;
    let passphrase = account.api_passphrase.as_deref().ok_or_else(missing)?;

    Ok(ApiCredentials {
        address: account.wallet_address.clone(),
        key: cipher.decrypt(key).map_err(|e| with_field(e, "api_key"))?,
        secret: cipher.decrypt(secret).map_err(|e| with_field(e, "api_secret"))?,
        passphrase: cipher
            .decrypt(passphrase)
            .map_err(|e| with_field(e, "api_passphrase"))?,
    })
}

fn with_field(err: CredentialError, field: &'static str) -> CredentialError {
    match err {
        CredentialError::Decrypt { reason, .. } => CredentialError::Decrypt { field, reason },
        other => other,
    }
}
