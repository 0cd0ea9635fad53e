//! Calls to the identity provider: code exchange and ID-token verification.

use super::{jwks::IdClaims, AuthError, JwksCache, OidcConfig};
use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{error, instrument};

/// Token endpoint response. Only the ID token is used.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Trade an authorization code for a token set.
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError>;

    /// Verify an ID token's signature and claims against this client.
    async fn verify_id_token(&self, id_token: &str) -> Result<IdClaims, AuthError>;
}

/// OpenID Connect provider reached over HTTP.
#[derive(Debug)]
pub struct OidcProvider {
    config: OidcConfig,
    client: Client,
    jwks: JwksCache,
}

impl OidcProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OidcConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.http_timeout())
            .build()?;

        let jwks = JwksCache::remote(config.jwks_url().to_string(), client.clone());

        Ok(Self {
            config,
            client,
            jwks,
        })
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        let response = self
            .client
            .post(self.config.token_url())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri()),
                ("client_id", self.config.client_id()),
                ("client_secret", self.config.client_secret().expose_secret()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            error!("Token endpoint returned {}: {}", status, body);

            return Err(AuthError::TokenEndpoint(status));
        }

        Ok(response.json::<TokenSet>().await?)
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<IdClaims, AuthError> {
        self.jwks
            .verify(id_token, self.config.client_id(), self.config.issuers())
            .await
    }
}
