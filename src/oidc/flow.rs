//! Authorization-code flow: build the provider redirect, then turn a callback
//! into a verified subject.

use super::{config::SCOPES, AuthError, IdentityProvider, OidcConfig};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

const STATE_BYTES: usize = 32;

/// Redirect target plus the state value to keep in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Query parameters the provider sends to the redirect URI.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub struct AuthFlow {
    config: OidcConfig,
    provider: Arc<dyn IdentityProvider>,
}

impl AuthFlow {
    #[must_use]
    pub fn new(config: OidcConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { config, provider }
    }

    /// Build the provider authorization URL with a fresh single-use state.
    ///
    /// # Errors
    /// Returns an error if the configured authorization URL is invalid.
    pub fn begin_login(&self) -> Result<AuthorizationRequest, AuthError> {
        let state = generate_state();

        let mut url = Url::parse(self.config.auth_url())?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", self.config.client_id())
            .append_pair("redirect_uri", self.config.redirect_uri())
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", &state);

        debug!("authorization URL: {}", url);

        Ok(AuthorizationRequest {
            url: url.to_string(),
            state,
        })
    }

    /// Validate a callback against the state held in the session, exchange the code
    /// and return the verified subject identifier.
    ///
    /// The state is compared before the provider is contacted.
    ///
    /// # Errors
    /// - [`AuthError::ProviderDenied`] when the provider reports an error
    /// - [`AuthError::StateMismatch`] when the state is missing or differs
    /// - [`AuthError::MissingCode`] when no code was returned
    /// - token exchange and verification errors otherwise
    #[instrument(skip_all)]
    pub async fn handle_callback(
        &self,
        params: &CallbackParams,
        expected_state: Option<&str>,
    ) -> Result<String, AuthError> {
        if let Some(error) = &params.error {
            let description = params.error_description.as_deref().unwrap_or_default();
            warn!("Provider returned error {}: {}", error, description);
            return Err(AuthError::ProviderDenied(error.clone()));
        }

        match (expected_state, params.state.as_deref()) {
            (Some(expected), Some(returned)) if expected == returned => {}
            _ => {
                warn!("OAuth state mismatch");
                return Err(AuthError::StateMismatch);
            }
        }

        let code = params
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let tokens = self.provider.exchange_code(code).await?;
        let id_token = tokens.id_token.ok_or(AuthError::MissingIdToken)?;

        let claims = self.provider.verify_id_token(&id_token).await?;

        info!(subject = %claims.sub, "ID token verified");

        Ok(claims.sub)
    }
}

impl std::fmt::Debug for AuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthFlow")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// 32 bytes from the OS RNG, base64url without padding.
fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}
