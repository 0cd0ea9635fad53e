//! Provider endpoints, client credentials and the provider-issued secrets file.

use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";

pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
    "openid",
];

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Immutable provider configuration, built once at startup.
#[derive(Clone)]
pub struct OidcConfig {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    jwks_url: String,
    issuers: Vec<String>,
    http_timeout: Duration,
}

impl OidcConfig {
    /// Google endpoints with the given client credentials.
    #[must_use]
    pub fn new(client_id: String, client_secret: SecretString) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            issuers: GOOGLE_ISSUERS.iter().map(ToString::to_string).collect(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: String) -> Self {
        self.redirect_uri = redirect_uri;
        self
    }

    #[must_use]
    pub fn with_auth_url(mut self, url: String) -> Self {
        self.auth_url = url;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: String) -> Self {
        self.token_url = url;
        self
    }

    #[must_use]
    pub fn with_jwks_url(mut self, url: String) -> Self {
        self.jwks_url = url;
        self
    }

    #[must_use]
    pub fn with_issuers(mut self, issuers: Vec<String>) -> Self {
        self.issuers = issuers;
        self
    }

    #[must_use]
    pub const fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub const fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    #[must_use]
    pub fn issuers(&self) -> &[String] {
        &self.issuers
    }

    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("jwks_url", &self.jwks_url)
            .field("issuers", &self.issuers)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Credentials file as downloaded from the provider console.
///
/// The client block sits under `web` or `installed` depending on the client type.
#[derive(Debug, Deserialize)]
pub struct ClientSecrets {
    #[serde(alias = "installed")]
    web: ClientSecretsBlock,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsBlock {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl ClientSecrets {
    /// # Errors
    /// Returns an error if the file cannot be read or is not a client secrets document.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secrets file: {}", path.display()))?;
        Self::from_json(&json)
    }

    /// # Errors
    /// Returns an error if `json` is not a client secrets document.
    pub fn from_json(json: &str) -> Result<Self> {
        let secrets: Self = serde_json::from_str(json).context("Invalid client secrets JSON")?;
        if secrets.web.client_id.trim().is_empty() {
            return Err(anyhow!("client secrets file has an empty client_id"));
        }
        Ok(secrets)
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.web.client_id
    }

    #[must_use]
    pub fn client_secret(&self) -> SecretString {
        SecretString::from(self.web.client_secret.clone())
    }

    #[must_use]
    pub fn auth_uri(&self) -> Option<&str> {
        self.web.auth_uri.as_deref()
    }

    #[must_use]
    pub fn token_uri(&self) -> Option<&str> {
        self.web.token_uri.as_deref()
    }

    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.web.redirect_uris.first().map(String::as_str)
    }
}
