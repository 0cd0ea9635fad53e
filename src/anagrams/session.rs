//! Browser session held in one encrypted cookie.

use anyhow::{anyhow, Result};
use axum_extra::extract::{
    cookie::{Cookie, Key, SameSite},
    PrivateCookieJar,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

pub const SESSION_COOKIE: &str = "anagrams_session";

/// Shortest secret accepted for deriving the cookie key.
pub const MIN_SECRET_KEY_LEN: usize = 32;

/// Derive the cookie encryption key from the configured secret.
///
/// # Errors
/// Returns an error if the secret is shorter than [`MIN_SECRET_KEY_LEN`] bytes.
pub fn cookie_key(secret: &SecretString) -> Result<Key> {
    let secret = secret.expose_secret().as_bytes();
    if secret.len() < MIN_SECRET_KEY_LEN {
        return Err(anyhow!(
            "secret key must be at least {MIN_SECRET_KEY_LEN} bytes, got {}",
            secret.len()
        ));
    }
    Ok(Key::derive_from(secret))
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    ttl: Duration,
    secure: bool,
}

impl SessionConfig {
    #[must_use]
    pub const fn new(ttl: Duration, secure: bool) -> Self {
        Self { ttl, secure }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub const fn secure(&self) -> bool {
        self.secure
    }
}

/// Session contents: the pending login `state` and the signed-in subject.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Session {
    /// Read the session from the jar. A missing, tampered or undecodable cookie
    /// reads as an empty session.
    #[must_use]
    pub fn load(jar: &PrivateCookieJar) -> Self {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| {
                serde_json::from_str(cookie.value())
                    .map_err(|err| debug!("Ignoring unreadable session cookie: {}", err))
                    .ok()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.state.is_none() && self.subject.is_none()
    }

    /// Write the session back, or remove the cookie when nothing is left in it.
    #[must_use]
    pub fn store(&self, jar: PrivateCookieJar, config: &SessionConfig) -> PrivateCookieJar {
        if self.is_empty() {
            return Self::clear(jar);
        }

        match serde_json::to_string(self) {
            Ok(value) => jar.add(session_cookie(value, config)),
            Err(err) => {
                error!("Failed to encode session: {}", err);
                jar
            }
        }
    }

    #[must_use]
    pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}

fn session_cookie(value: String, config: &SessionConfig) -> Cookie<'static> {
    let max_age = i64::try_from(config.ttl().as_secs()).unwrap_or(i64::MAX);

    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(config.secure())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .build()
}
