//! Credential Decryption Adapters

mod passthrough;

pub use passthrough::PassthroughDecryptor;
