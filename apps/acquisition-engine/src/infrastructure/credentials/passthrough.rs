//! Pass-through credential decryptor for development.
//!
//! Treats the stored secret as plaintext. Deployments plug in a real
//! decryptor behind the same port.

use async_trait::async_trait;

use crate::application::ports::{CredentialDecryptor, CredentialError, Credentials};
use crate::domain::reservation::EncryptedCredential;
use crate::domain::shared::PrincipalId;

/// Returns the stored secret unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecryptor;

#[async_trait]
impl CredentialDecryptor for PassthroughDecryptor {
    async fn decrypt(
        &self,
        principal: &PrincipalId,
        credential: &EncryptedCredential,
    ) -> Result<Credentials, CredentialError> {
        if credential.username.is_empty() || credential.encrypted_secret.is_empty() {
            return Err(CredentialError::DecryptFailed {
                principal: principal.clone(),
                message: "empty username or secret".to_string(),
            });
        }

        Ok(Credentials {
            username: credential.username.clone(),
            secret: credential.encrypted_secret.clone(),
        })
    }
}
