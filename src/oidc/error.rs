use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("state parameter does not match the session")]
    StateMismatch,
    #[error("missing authorization code")]
    MissingCode,
    #[error("provider returned error: {0}")]
    ProviderDenied(String),
    #[error("token endpoint returned {0}")]
    TokenEndpoint(reqwest::StatusCode),
    #[error("token response missing id_token")]
    MissingIdToken,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid id token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid id token: {0}")]
    InvalidToken(String),
    #[error("no signing key for kid {0:?}")]
    UnknownKey(Option<String>),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl AuthError {
    /// Token failed signature, audience, issuer, expiry or claim checks.
    #[must_use]
    pub const fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::Jwt(_) | Self::InvalidToken(_) | Self::UnknownKey(_) | Self::MissingIdToken
        )
    }
}
