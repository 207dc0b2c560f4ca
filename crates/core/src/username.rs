//! Username rules and alternative suggestions for taken names.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

pub const MIN_USERNAME_LENGTH: usize = 4;
pub const MAX_USERNAME_LENGTH: usize = 20;

/// How many suggestions the signup endpoint returns.
pub const SUGGESTION_COUNT: usize = 3;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{3,19}$").expect("valid regex"));

/// Validate a username: 4-20 characters of lowercase letters, digits, or `_`,
/// starting with a letter.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Username must be {MIN_USERNAME_LENGTH}-{MAX_USERNAME_LENGTH} characters of \
             lowercase letters, digits, or '_', starting with a letter"
        )))
    }
}

/// Lowercase, drop disallowed characters, and cut to a length that leaves
/// room for a suffix.
fn sanitize_base(base: &str) -> String {
    let mut cleaned: String = base
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    let first_letter = cleaned.find(|c: char| c.is_ascii_lowercase()).unwrap_or(cleaned.len());
    cleaned.drain(..first_letter);
    if cleaned.is_empty() {
        cleaned.push_str("user");
    }
    cleaned.truncate(MAX_USERNAME_LENGTH - 7);
    cleaned
}

/// Candidate alternatives to a taken username, in preference order. Every
/// candidate is itself a valid username; the caller filters out taken ones.
pub fn suggest_usernames(base: &str, year: i32) -> Vec<String> {
    let base = sanitize_base(base);
    let yy = year.rem_euclid(100);

    let raw = [
        format!("{base}1"),
        format!("{base}2"),
        format!("{base}3"),
        format!("{base}_{year}"),
        format!("{base}{yy:02}"),
        format!("{base}_cruise"),
        format!("{base}_trip"),
        format!("{base}_sea"),
    ];

    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for candidate in raw {
        let candidate = pad_to_min(candidate);
        if validate_username(&candidate).is_ok() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

fn pad_to_min(mut candidate: String) -> String {
    while candidate.len() < MIN_USERNAME_LENGTH {
        candidate.push('0');
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_usernames() {
        assert!(validate_username("cruiser").is_ok());
        assert!(validate_username("kim_2026").is_ok());
    }

    #[test]
    fn invalid_usernames() {
        assert!(validate_username("abc").is_err());
        assert!(validate_username("1cruiser").is_err());
        assert!(validate_username("Cruiser").is_err());
        assert!(validate_username("cruise-r").is_err());
        assert!(validate_username(&"a".repeat(21)).is_err());
    }

    #[test]
    fn suggestions_in_order() {
        let s = suggest_usernames("captain", 2026);
        assert_eq!(
            &s[..6],
            &["captain1", "captain2", "captain3", "captain_2026", "captain26", "captain_cruise"]
        );
    }

    #[test]
    fn suggestions_are_valid_for_messy_input() {
        for base in ["", "!!", "99Kim", "A_VERY_LONG_USERNAME_THAT_OVERFLOWS", "x"] {
            let s = suggest_usernames(base, 2026);
            assert!(!s.is_empty(), "no suggestions for {base:?}");
            for candidate in &s {
                assert!(validate_username(candidate).is_ok(), "{candidate} invalid");
            }
        }
    }

    #[test]
    fn suggestions_deduplicated() {
        let s = suggest_usernames("sea", 2026);
        let mut sorted = s.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), s.len());
    }
}
