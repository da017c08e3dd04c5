//! Credential Decryptor Port (Driven Port)

use async_trait::async_trait;

use super::session_port::Credentials;
use crate::domain::reservation::EncryptedCredential;
use crate::domain::shared::PrincipalId;

/// Decryption error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The secret could not be decrypted.
    #[error("cannot decrypt credentials for {principal}: {message}")]
    DecryptFailed {
        /// Principal.
        principal: PrincipalId,
        /// Error details.
        message: String,
    },
}

/// Port for credential decryption. Plaintext is used once and never stored.
#[async_trait]
pub trait CredentialDecryptor: Send + Sync {
    /// Decrypt `credential` for `principal`.
    async fn decrypt(
        &self,
        principal: &PrincipalId,
        credential: &EncryptedCredential,
    ) -> Result<Credentials, CredentialError>;
}
