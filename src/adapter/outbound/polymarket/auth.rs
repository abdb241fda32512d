//! CLOB L2 (HMAC-SHA256) request signing.
//!
//! Signature = URL-safe base64 of `HMAC-SHA256(base64-decode(secret),
//! timestamp + method + path + body)`.

use base64::{
    engine::general_purpose::{STANDARD as BASE64_STANDARD, URL_SAFE as BASE64_URL_SAFE},
    Engine,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::ApiCredentials;
use crate::error::CredentialError;

type HmacSha256 = Hmac<Sha256>;

pub const POLY_ADDRESS: &str = "POLY_ADDRESS";
pub const POLY_SIGNATURE: &str = "POLY_SIGNATURE";
pub const POLY_TIMESTAMP: &str = "POLY_TIMESTAMP";
pub const POLY_API_KEY: &str = "POLY_API_KEY";
pub const POLY_PASSPHRASE: &str = "POLY_PASSPHRASE";

/// Headers for one L2-authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2Headers {
    pub address: String,
    pub signature: String,
    pub timestamp: String,
    pub api_key: String,
    pub passphrase: String,
}

impl L2Headers {
    /// Header name/value pairs in wire order.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 5] {
        [
            (POLY_ADDRESS, self.address.as_str()),
            (POLY_SIGNATURE, self.signature.as_str()),
            (POLY_TIMESTAMP, self.timestamp.as_str()),
            (POLY_API_KEY, self.api_key.as_str()),
            (POLY_PASSPHRASE, self.passphrase.as_str()),
        ]
    }
}

/// Build L2 headers for `method path` at `timestamp` (unix seconds).
///
/// # Errors
///
/// Returns [`CredentialError::InvalidKey`] if the secret is not base64.
pub fn l2_headers(
    credentials: &ApiCredentials,
    timestamp: i64,
    method: &str,
    path: &str,
    body: &str,
) -> Result<L2Headers, CredentialError> {
    let timestamp = timestamp.to_string();
    let signature = sign(&credentials.secret, &timestamp, method, path, body)?;
    Ok(L2Headers {
        address: credentials.address.clone(),
        signature,
        timestamp,
        api_key: credentials.key.clone(),
        passphrase: credentials.passphrase.clone(),
    })
}

fn sign(
    secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &str,
) -> Result<String, CredentialError> {
    let key = BASE64_URL_SAFE
        .decode(secret)
        .or_else(|_| BASE64_STANDARD.decode(secret))
        .map_err(|e| CredentialError::InvalidKey(format!("api secret is not base64: {e}")))?;

    let mut message = format!("{timestamp}{method}{path}");
    message.push_str(body);

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(BASE64_URL_SAFE.encode(mac.finalize().into_bytes()))
}
