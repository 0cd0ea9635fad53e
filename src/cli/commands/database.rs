use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_DSN: &str = "dsn";
pub const ARG_DB_USER: &str = "db-user";
pub const ARG_DB_PASSWORD: &str = "db-password";
pub const ARG_DB_TIMEOUT_SECONDS: &str = "db-timeout-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub dsn: String,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse database arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the DSN is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let dsn = matches
            .get_one::<String>(ARG_DSN)
            .cloned()
            .context("missing required argument: --dsn")?;

        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        Ok(Self {
            dsn,
            user: get_non_empty(ARG_DB_USER),
            password: get_non_empty(ARG_DB_PASSWORD).map(SecretString::from),
            timeout_seconds: matches
                .get_one::<u64>(ARG_DB_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(5),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help(
                    "Database connection string, example: postgres://localhost:5432/anagrams. \
                     --db-user and --db-password override the credentials in the DSN.",
                )
                .env("ANAGRAMS_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DB_USER)
                .long(ARG_DB_USER)
                .help("Database user")
                .env("ANAGRAMS_DB_USER"),
        )
        .arg(
            Arg::new(ARG_DB_PASSWORD)
                .long(ARG_DB_PASSWORD)
                .help("Database password")
                .env("ANAGRAMS_DB_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_DB_TIMEOUT_SECONDS)
                .long(ARG_DB_TIMEOUT_SECONDS)
                .help("Timeout in seconds for each database call")
                .env("ANAGRAMS_DB_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
