//! # Anagrams
//!
//! `anagrams` is a small web service that signs users in through an external
//! OpenID Connect provider and answers one question: are these two strings
//! anagrams of each other?
//!
//! ## Login
//!
//! Login uses the OAuth2 authorization-code grant. `/login` stores a random
//! `state` value in the encrypted session cookie and redirects to the provider;
//! `/callback` checks the returned `state` before exchanging the code, verifies
//! the ID token (signature against the provider JWKS, audience, issuer, expiry)
//! and records the token subject in the session.
//!
//! ## Anagram lookup
//!
//! Inputs are lower-cased and nothing else: whitespace and punctuation are
//! significant. Results are memoized in the `strings` table; a pair is looked
//! up in either order before the comparison is computed and stored.

pub mod anagram;
pub mod anagrams;
pub mod cli;
pub mod oidc;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
