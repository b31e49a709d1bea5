//! Bearer token retrieval for the items API.
//!
//! The token is looked up once per run and never refreshed. Two providers
//! exist: [`SecretsManagerTokenProvider`] reads the job's secret, and
//! [`StaticTokenProvider`] serves a token given on the command line.

use crate::error::CredentialError;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use serde::Deserialize;
use tracing::{info, instrument};

/// Source of the API bearer token.
pub trait TokenProvider {
    /// `Ok(None)` means requests go out unauthenticated.
    async fn api_token(&self) -> Result<Option<String>, CredentialError>;
}

/// Token passed in directly, or no token at all.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl TokenProvider for StaticTokenProvider {
    async fn api_token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an AWS Secrets Manager secret.
#[derive(Debug, Clone)]
pub struct SecretsManagerTokenProvider {
    client: Client,
    secret_name: String,
}

impl SecretsManagerTokenProvider {
    pub fn new(sdk_config: &aws_config::SdkConfig, secret_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(sdk_config),
            secret_name: secret_name.into(),
        }
    }
}

impl TokenProvider for SecretsManagerTokenProvider {
    #[instrument(level = "info", skip_all, fields(secret_name = %self.secret_name))]
    async fn api_token(&self) -> Result<Option<String>, CredentialError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_name)
            .send()
            .await
            .map_err(|e| CredentialError::Lookup {
                secret_name: self.secret_name.clone(),
                message: DisplayErrorContext(e).to_string(),
            })?;

        let secret_string =
            output
                .secret_string()
                .ok_or_else(|| CredentialError::MissingSecretString {
                    secret_name: self.secret_name.clone(),
                })?;

        let token = token_from_secret(&self.secret_name, secret_string)?;
        info!("Resolved API token from secret");
        Ok(Some(token))
    }
}

#[derive(Deserialize)]
struct SecretPayload {
    api_token: Option<String>,
}

/// Extract the token from a secret string.
///
/// Accepts the JSON form `{"api_token": "..."}` or a bare token.
fn token_from_secret(secret_name: &str, secret_string: &str) -> Result<String, CredentialError> {
    let trimmed = secret_string.trim();
    let token = if trimmed.starts_with('{') {
        serde_json::from_str::<SecretPayload>(trimmed)
            .ok()
            .and_then(|p| p.api_token)
            .unwrap_or_default()
    } else {
        trimmed.to_string()
    };

    if token.is_empty() {
        return Err(CredentialError::MissingToken {
            secret_name: secret_name.to_string(),
        });
    }
    Ok(token)
}
