//! Anagram comparison and the memoizing lookup service.

pub mod service;
pub mod store;

pub use self::service::AnagramService;
pub use self::store::{AnagramRecord, AnagramStore, PgAnagramStore, StoreError};

/// Lower-case an input. Whitespace and punctuation are kept as-is.
#[must_use]
pub fn normalize(input: &str) -> String {
    input.to_lowercase()
}

/// Two strings are anagrams when their sorted character sequences are equal.
///
/// Callers normalize first; this compares exactly what it is given.
#[must_use]
pub fn is_anagram(one: &str, two: &str) -> bool {
    if one.chars().count() != two.chars().count() {
        return false;
    }

    let mut left: Vec<char> = one.chars().collect();
    let mut right: Vec<char> = two.chars().collect();
    left.sort_unstable();
    right.sort_unstable();

    left == right
}

/// Text form of a result, as returned by `/AddStrings`.
#[must_use]
pub const fn flag_text(is_anagram: bool) -> &'static str {
    if is_anagram {
        "True"
    } else {
        "False"
    }
}
