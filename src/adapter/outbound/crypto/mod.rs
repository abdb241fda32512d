//! Credential encryption at rest.

mod aes;

pub use aes::AesGcmCipher;
