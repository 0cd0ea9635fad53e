use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;
use std::path::PathBuf;

pub const ARG_CLIENT_SECRETS_FILE: &str = "client-secrets-file";
pub const ARG_CLIENT_ID: &str = "client-id";
pub const ARG_CLIENT_SECRET: &str = "client-secret";
pub const ARG_REDIRECT_URI: &str = "redirect-uri";
pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_TOKEN_URL: &str = "token-url";
pub const ARG_JWKS_URL: &str = "jwks-url";
pub const ARG_ISSUER: &str = "issuer";
pub const ARG_HTTP_TIMEOUT_SECONDS: &str = "http-timeout-seconds";

/// Provider settings as given on the command line. Values still missing here are
/// filled from the client secrets file or the built-in Google defaults.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub client_secrets_file: Option<PathBuf>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: Option<String>,
    pub auth_url: Option<String>,
    pub token_url: Option<String>,
    pub jwks_url: Option<String>,
    pub issuers: Vec<String>,
    pub http_timeout_seconds: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        // clap passes through empty env values
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        Self {
            client_secrets_file: get_non_empty(ARG_CLIENT_SECRETS_FILE).map(PathBuf::from),
            client_id: get_non_empty(ARG_CLIENT_ID),
            client_secret: get_non_empty(ARG_CLIENT_SECRET).map(SecretString::from),
            redirect_uri: get_non_empty(ARG_REDIRECT_URI),
            auth_url: get_non_empty(ARG_AUTH_URL),
            token_url: get_non_empty(ARG_TOKEN_URL),
            jwks_url: get_non_empty(ARG_JWKS_URL),
            issuers: matches
                .get_many::<String>(ARG_ISSUER)
                .map(|values| {
                    values
                        .filter(|v| !v.trim().is_empty())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            http_timeout_seconds: matches
                .get_one::<u64>(ARG_HTTP_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(10),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_credentials_args(command);
    with_endpoint_args(command)
}

fn with_credentials_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CLIENT_SECRETS_FILE)
                .long(ARG_CLIENT_SECRETS_FILE)
                .help("Path to the OAuth client secrets JSON downloaded from the provider console")
                .env("ANAGRAMS_CLIENT_SECRETS_FILE"),
        )
        .arg(
            Arg::new(ARG_CLIENT_ID)
                .long(ARG_CLIENT_ID)
                .help("OAuth client id, also the expected ID token audience")
                .env("ANAGRAMS_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_CLIENT_SECRET)
                .long(ARG_CLIENT_SECRET)
                .help("OAuth client secret")
                .env("ANAGRAMS_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URI)
                .long(ARG_REDIRECT_URI)
                .help("Callback URL registered with the provider")
                .env("ANAGRAMS_REDIRECT_URI"),
        )
}

fn with_endpoint_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long(ARG_AUTH_URL)
                .help("Provider authorization endpoint")
                .env("ANAGRAMS_AUTH_URL"),
        )
        .arg(
            Arg::new(ARG_TOKEN_URL)
                .long(ARG_TOKEN_URL)
                .help("Provider token endpoint")
                .env("ANAGRAMS_TOKEN_URL"),
        )
        .arg(
            Arg::new(ARG_JWKS_URL)
                .long(ARG_JWKS_URL)
                .help("Provider JWKS endpoint")
                .env("ANAGRAMS_JWKS_URL"),
        )
        .arg(
            Arg::new(ARG_ISSUER)
                .long(ARG_ISSUER)
                .help("Accepted ID token issuer (iss), repeatable")
                .env("ANAGRAMS_ISSUER")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_HTTP_TIMEOUT_SECONDS)
                .long(ARG_HTTP_TIMEOUT_SECONDS)
                .help("Timeout in seconds for calls to the provider")
                .env("ANAGRAMS_HTTP_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
