use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SECRET_KEY: &str = "secret-key";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_INSECURE_COOKIES: &str = "insecure-cookies";

#[derive(Debug, Clone)]
pub struct Options {
    pub secret_key: SecretString,
    pub ttl_seconds: u64,
    pub insecure_cookies: bool,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret key is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret_key = matches
            .get_one::<String>(ARG_SECRET_KEY)
            .cloned()
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
            .context("missing required argument: --secret-key")?;

        Ok(Self {
            secret_key,
            ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(43_200),
            insecure_cookies: matches.get_flag(ARG_INSECURE_COOKIES),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long(ARG_SECRET_KEY)
                .help("Secret used to encrypt the session cookie (at least 32 bytes)")
                .env("ANAGRAMS_SECRET_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("ANAGRAMS_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_INSECURE_COOKIES)
                .long(ARG_INSECURE_COOKIES)
                .help("Send the session cookie without the Secure attribute (plain http, local only)")
                .env("ANAGRAMS_INSECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET_KEY: &str = "0123456789abcdef0123456789abcdef";

    fn try_parse(args: &[&str]) -> Result<Options> {
        let mut argv = vec!["anagrams", "--secret-key", SECRET_KEY];
        argv.extend_from_slice(args);
        let matches = with_args(Command::new("anagrams")).try_get_matches_from(argv)?;
        Options::parse(&matches)
    }

    #[test]
    fn defaults_to_twelve_hours_and_secure_cookies() {
        temp_env::with_vars_unset(
            ["ANAGRAMS_SESSION_TTL_SECONDS", "ANAGRAMS_INSECURE_COOKIES"],
            || {
                let options = try_parse(&[]).unwrap();
                assert_eq!(options.ttl_seconds, 43_200);
                assert!(!options.insecure_cookies);
            },
        );
    }

    #[test]
    fn zero_ttl_is_rejected() {
        temp_env::with_vars_unset(["ANAGRAMS_SESSION_TTL_SECONDS"], || {
            assert!(try_parse(&["--session-ttl-seconds", "0"]).is_err());
            assert_eq!(
                try_parse(&["--session-ttl-seconds", "1"]).unwrap().ttl_seconds,
                1
            );
        });

        temp_env::with_var("ANAGRAMS_SESSION_TTL_SECONDS", Some("0"), || {
            assert!(try_parse(&[]).is_err());
        });
    }
}
