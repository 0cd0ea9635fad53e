//! Provider signing keys and ID-token verification.

use super::AuthError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::{header::CACHE_CONTROL, Client};
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime},
};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

// Keys live in memory for the provider's advertised max-age. An unknown kid forces a
// refresh, throttled by a cooldown; a failed refresh keeps the last good keys.
const DEFAULT_JWKS_MAX_AGE_SECONDS: u64 = 300;
const UNKNOWN_KID_REFRESH_COOLDOWN_SECONDS: u64 = 30;

/// Claims this service reads from a verified ID token.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IdClaims {
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    kty: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Clone, Default)]
struct KeySet {
    keyed: HashMap<String, DecodingKey>,
    unkeyed: Vec<DecodingKey>,
}

impl KeySet {
    /// Keep RSA keys usable for RS256; anything else in the document is ignored.
    fn from_document(document: JwksDocument) -> Self {
        let mut set = Self::default();

        for key in document.keys {
            if key.kty != "RSA" {
                continue;
            }
            if key.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                continue;
            }
            let (Some(n), Some(e)) = (key.n, key.e) else {
                continue;
            };
            let decoding_key = match DecodingKey::from_rsa_components(&n, &e) {
                Ok(decoding_key) => decoding_key,
                Err(err) => {
                    warn!("Skipping unusable JWK {:?}: {}", key.kid, err);
                    continue;
                }
            };

            match key.kid {
                Some(kid) if !kid.trim().is_empty() => {
                    set.keyed.insert(kid, decoding_key);
                }
                _ => set.unkeyed.push(decoding_key),
            }
        }

        set
    }

    fn len(&self) -> usize {
        self.keyed.len() + self.unkeyed.len()
    }

    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.keyed.get(kid).cloned(),
            // A token without kid is only unambiguous against a single-key set.
            None if self.len() == 1 => self
                .unkeyed
                .first()
                .cloned()
                .or_else(|| self.keyed.values().next().cloned()),
            None => None,
        }
    }
}

struct CachedKeys {
    keys: KeySet,
    fetched_at: Instant,
    max_age: Duration,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.max_age
    }
}

/// Cached provider JWKS used to verify ID tokens.
pub struct JwksCache {
    url: String,
    client: Client,
    cache: RwLock<Option<CachedKeys>>,
    last_forced_refresh_unix: AtomicU64,
}

impl JwksCache {
    /// Keys are fetched on first use.
    #[must_use]
    pub fn remote(url: String, client: Client) -> Self {
        Self {
            url,
            client,
            cache: RwLock::new(None),
            last_forced_refresh_unix: AtomicU64::new(0),
        }
    }

    /// Keys from a JWKS document, fresh forever; `url` is only hit for unknown kids.
    #[cfg(test)]
    pub(crate) fn preloaded(url: &str, json: &str) -> Result<Self, AuthError> {
        let document: JwksDocument = serde_json::from_str(json)
            .map_err(|err| AuthError::InvalidToken(format!("invalid JWKS document: {err}")))?;

        Ok(Self {
            url: url.to_string(),
            client: Client::new(),
            cache: RwLock::new(Some(CachedKeys {
                keys: KeySet::from_document(document),
                fetched_at: Instant::now(),
                max_age: Duration::MAX,
            })),
            last_forced_refresh_unix: AtomicU64::new(0),
        })
    }

    /// Verify an RS256 ID token and return its claims.
    ///
    /// # Errors
    /// Returns an error if the signature, audience, issuer or expiry check fails, if no
    /// key matches the token `kid`, or if the keys cannot be fetched.
    #[instrument(skip(self, id_token))]
    pub async fn verify(
        &self,
        id_token: &str,
        audience: &str,
        issuers: &[String],
    ) -> Result<IdClaims, AuthError> {
        let header = decode_header(id_token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let key = self.key_for(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[audience]);
        validation.set_issuer(issuers);
        validation.required_spec_claims = HashSet::from([
            "exp".to_string(),
            "aud".to_string(),
            "iss".to_string(),
            "sub".to_string(),
        ]);

        let token = decode::<IdClaims>(id_token, &key, &validation)?;

        if token.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("sub claim is empty".to_string()));
        }

        Ok(token.claims)
    }

    async fn key_for(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let fresh = self.cache.read().await.as_ref().is_some_and(CachedKeys::is_fresh);

        if !fresh {
            if let Err(err) = self.refresh().await {
                if self.cache.read().await.is_none() {
                    return Err(err);
                }
                warn!("JWKS refresh failed, keeping previous keys: {}", err);
            }
        }

        if let Some(key) = self.lookup(kid).await {
            return Ok(key);
        }

        if self.may_force_refresh() {
            debug!("Unknown kid {:?}, refreshing JWKS", kid);
            self.refresh().await?;

            if let Some(key) = self.lookup(kid).await {
                return Ok(key);
            }
        }

        Err(AuthError::UnknownKey(kid.map(ToString::to_string)))
    }

    async fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        self.cache
            .read()
            .await
            .as_ref()
            .and_then(|cached| cached.keys.lookup(kid))
    }

    fn may_force_refresh(&self) -> bool {
        let now = unix_now();
        let last = self.last_forced_refresh_unix.load(Ordering::Relaxed);
        if now.saturating_sub(last) < UNKNOWN_KID_REFRESH_COOLDOWN_SECONDS {
            return false;
        }

        self.last_forced_refresh_unix
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    async fn refresh(&self) -> Result<(), AuthError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;

        let max_age = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_JWKS_MAX_AGE_SECONDS);

        let document: JwksDocument = response.json().await?;
        let keys = KeySet::from_document(document);

        debug!("Fetched {} JWKS keys, max-age {}s", keys.len(), max_age);

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
            max_age: Duration::from_secs(max_age),
        });

        Ok(())
    }
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|seconds| seconds.trim().parse::<u64>().ok())
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
