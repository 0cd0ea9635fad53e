//! Session guard for routes that need a signed-in user.

use super::session::Session;
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use tracing::debug;

/// Subject of the signed-in user, available to guarded handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSubject(pub String);

/// Reject the request with 401 unless the session carries a subject. The inner
/// handler is not called in that case.
pub async fn require_subject(jar: PrivateCookieJar, mut request: Request, next: Next) -> Response {
    let Some(subject) = Session::load(&jar).subject else {
        debug!("No session subject for {}", request.uri().path());
        return StatusCode::UNAUTHORIZED.into_response();
    };

    request
        .extensions_mut()
        .insert(AuthenticatedSubject(subject));

    next.run(request).await
}
