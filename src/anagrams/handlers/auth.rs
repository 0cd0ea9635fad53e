//! Login, provider callback and logout.

use crate::anagrams::{error::AppError, session::Session, AppState};
use crate::oidc::CallbackParams;
use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use tracing::info;

pub const PROTECTED_PATH: &str = "/protected_resource";

/// Store a fresh `state` in the session and send the browser to the provider.
///
/// # Errors
/// Returns an error if the authorization URL cannot be built.
pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    let request = state.auth.begin_login()?;

    let mut session = Session::load(&jar);
    session.state = Some(request.state);

    Ok((
        session.store(jar, &state.session),
        Redirect::to(&request.url),
    ))
}

/// Finish the login. The pending `state` is consumed whatever the outcome; the
/// subject is written only after the ID token verifies.
///
/// # Errors
/// Returns the session jar with the mapped error so the consumed state is persisted.
pub async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), (PrivateCookieJar, AppError)> {
    let mut session = Session::load(&jar);
    let expected_state = session.state.take();

    match state
        .auth
        .handle_callback(&params, expected_state.as_deref())
        .await
    {
        Ok(subject) => {
            info!(subject = %subject, "User signed in");
            session.subject = Some(subject);
            Ok((
                session.store(jar, &state.session),
                Redirect::to(PROTECTED_PATH),
            ))
        }
        Err(err) => Err((session.store(jar, &state.session), AppError::from(err))),
    }
}

pub async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (Session::clear(jar), Redirect::to("/"))
}
