//! Configuration entities owned outside this core: leaders, follower
//! accounts and the copy-trading relationships between them.

use std::fmt;

use serde::Serialize;

use super::id::{AccountId, CopyTradingId, LeaderId};

/// A watched wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leader {
    pub id: LeaderId,
    /// Wallet address, `0x…`.
    pub address: String,
    pub name: Option<String>,
    pub category: Option<String>,
}

impl Leader {
    /// Address in the lower-case form the venue expects.
    #[must_use]
    pub fn normalized_address(&self) -> String {
        self.address.to_lowercase()
    }
}

/// A leader/follower pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyTrading {
    pub id: CopyTradingId,
    pub leader_id: LeaderId,
    pub account_id: AccountId,
    pub enabled: bool,
}

/// A follower account as stored: API credentials are encrypted at rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub wallet_address: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_passphrase: Option<String>,
}

impl Account {
    /// Whether all three encrypted credential fields are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some() && self.api_passphrase.is_some()
    }
}

/// Decrypted exchange API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub address: String,
    pub key: String,
    pub secret: String,
    pub passphrase: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("address", &self.address)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = ApiCredentials {
            address: "0xabc".into(),
            key: "key".into(),
            secret: "top-secret".into(),
            passphrase: "hunter2".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn normalized_address_is_lower_case() {
        let leader = Leader {
            id: LeaderId::new(1),
            address: "0xAbCd".into(),
            name: None,
            category: None,
        };
        assert_eq!(leader.normalized_address(), "0xabcd");
    }
}
