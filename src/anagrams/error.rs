use crate::{anagram::StoreError, oidc::AuthError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

/// Request failure as seen by the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => auth_status(err),
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        // possible forgery
        AuthError::StateMismatch => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::MissingCode => StatusCode::BAD_REQUEST,
        AuthError::ProviderDenied(_) => StatusCode::UNAUTHORIZED,
        AuthError::TokenEndpoint(status) if status.is_client_error() => StatusCode::UNAUTHORIZED,
        err if err.is_verification_failure() => StatusCode::UNAUTHORIZED,
        // transport failures and timeouts
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        let body = status.canonical_reason().unwrap_or_default();

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_status() {
        let cases = [
            (AuthError::StateMismatch, StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::MissingCode, StatusCode::BAD_REQUEST),
            (
                AuthError::ProviderDenied("access_denied".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AuthError::TokenEndpoint(StatusCode::BAD_REQUEST),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AuthError::TokenEndpoint(StatusCode::BAD_GATEWAY),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AuthError::MissingIdToken, StatusCode::UNAUTHORIZED),
            (
                AuthError::InvalidToken("empty sub".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (AuthError::UnknownKey(None), StatusCode::UNAUTHORIZED),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn store_and_input_errors_map_to_status() {
        let store = AppError::from(StoreError::Database(sqlx::Error::PoolClosed));
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let timeout = AppError::from(StoreError::Timeout(std::time::Duration::from_secs(5)));
        assert_eq!(timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bad = AppError::BadRequest("missing field".to_string());
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn response_carries_status() {
        let response = AppError::from(AuthError::StateMismatch).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
