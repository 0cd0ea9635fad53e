pub mod auth;
pub mod health;
pub mod strings;

#[cfg(test)]
mod tests;

use super::guard::AuthenticatedSubject;
use axum::{
    response::{Html, IntoResponse, Json},
    Extension,
};
use tracing::debug;

const LANDING_PAGE: &str = "Hello <a href='/login'><button>Login</button></a>";
const PROTECTED_PAGE: &str = include_str!("../../../templates/index.html");

// axum handler for /
pub async fn index() -> impl IntoResponse {
    Html(LANDING_PAGE)
}

// guarded by require_subject
pub async fn protected_resource(
    Extension(AuthenticatedSubject(subject)): Extension<AuthenticatedSubject>,
) -> impl IntoResponse {
    debug!(subject = %subject, "serving protected resource");
    Html(PROTECTED_PAGE)
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(super::openapi())
}
