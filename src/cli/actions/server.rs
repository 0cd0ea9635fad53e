use crate::{
    anagrams::{self, cookie_key, SessionConfig},
    cli::{
        commands::{database, oidc, session},
        telemetry,
    },
    oidc::{AuthFlow, ClientSecrets, OidcConfig, OidcProvider},
};
use anyhow::{anyhow, Context, Result};
use secrecy::ExposeSecret;
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub database: database::Options,
    pub session: session::Options,
    pub oidc: oidc::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is incomplete or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let dsn = database_dsn(&args.database)?;

    let oidc_config = oidc_config(&args.oidc)?;
    debug!("OIDC config: {:?}", oidc_config);

    let provider = OidcProvider::new(oidc_config.clone())
        .context("Failed to build identity provider client")?;
    let auth = AuthFlow::new(oidc_config, Arc::new(provider));

    let key = cookie_key(&args.session.secret_key)?;
    let session = SessionConfig::new(
        Duration::from_secs(args.session.ttl_seconds),
        !args.session.insecure_cookies,
    );

    let result = anagrams::new(
        args.port,
        dsn,
        Duration::from_secs(args.database.timeout_seconds),
        auth,
        session,
        key,
    )
    .await;

    telemetry::shutdown_tracer();

    result
}

/// DSN with the user and password options applied.
fn database_dsn(options: &database::Options) -> Result<String> {
    let mut dsn = Url::parse(&options.dsn).context("Invalid database DSN")?;

    if let Some(user) = &options.user {
        dsn.set_username(user)
            .map_err(|()| anyhow!("Error setting username"))?;
    }

    if let Some(password) = &options.password {
        dsn.set_password(Some(password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;
    }

    Ok(dsn.to_string())
}

/// Merge command-line values over the client secrets file. Flags win.
fn oidc_config(options: &oidc::Options) -> Result<OidcConfig> {
    let secrets = options
        .client_secrets_file
        .as_deref()
        .map(ClientSecrets::from_file)
        .transpose()?;

    let client_id = options
        .client_id
        .clone()
        .or_else(|| secrets.as_ref().map(|s| s.client_id().to_string()))
        .ok_or_else(|| {
            anyhow!("missing OAuth client id: set --client-id or --client-secrets-file")
        })?;

    let client_secret = options
        .client_secret
        .clone()
        .or_else(|| secrets.as_ref().map(ClientSecrets::client_secret))
        .ok_or_else(|| {
            anyhow!("missing OAuth client secret: set --client-secret or --client-secrets-file")
        })?;

    let from_file = |pick: fn(&ClientSecrets) -> Option<&str>| {
        secrets.as_ref().and_then(pick).map(ToString::to_string)
    };

    let mut config = OidcConfig::new(client_id, client_secret)
        .with_http_timeout(Duration::from_secs(options.http_timeout_seconds));

    if let Some(uri) = options
        .redirect_uri
        .clone()
        .or_else(|| from_file(ClientSecrets::redirect_uri))
    {
        config = config.with_redirect_uri(uri);
    }

    if let Some(url) = options
        .auth_url
        .clone()
        .or_else(|| from_file(ClientSecrets::auth_uri))
    {
        config = config.with_auth_url(url);
    }

    if let Some(url) = options
        .token_url
        .clone()
        .or_else(|| from_file(ClientSecrets::token_uri))
    {
        config = config.with_token_url(url);
    }

    if let Some(url) = options.jwks_url.clone() {
        config = config.with_jwks_url(url);
    }

    if !options.issuers.is_empty() {
        config = config.with_issuers(options.issuers.clone());
    }

    Ok(config)
}
