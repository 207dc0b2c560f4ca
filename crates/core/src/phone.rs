//! Phone number normalization.
//!
//! Leads are keyed by their normalized phone number, so every phone that
//! enters the system (checkout, landing-page registration, manual lead entry)
//! goes through [`normalize_phone`] first. The normalized form is the
//! domestic digit string, e.g. `01012345678`.

use std::sync::LazyLock;

use regex::Regex;

/// Domestic mobile numbers: `010`, `011`, `016`, `017`, `018`, `019` prefixes.
static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^01[016789][0-9]{7,8}$").expect("valid regex"));

/// Landline numbers: Seoul `02` plus three-digit area codes `031`..`064`,
/// and `070` internet phones.
static LANDLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(02[0-9]{7,8}|0[3-6][1-5][0-9]{7,8}|070[0-9]{8})$").expect("valid regex")
});

/// Normalize a user-entered phone number to its domestic digit form.
///
/// Strips every non-digit character, converts an `82` country code (written
/// as `+82`, `0082` or `82`) to the domestic leading `0`, and validates the
/// result against the mobile and landline patterns. Returns `None` if the
/// input is not a recognizable Korean number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    // Domestic numbers always begin with `0`, so a leading `82` can only be
    // a country code.
    let international = digits
        .strip_prefix("0082")
        .or_else(|| digits.strip_prefix("82"));
    let domestic = match international {
        Some(rest) => format!("0{}", rest.trim_start_matches('0')),
        None => digits,
    };

    if MOBILE_RE.is_match(&domestic) || LANDLINE_RE.is_match(&domestic) {
        Some(domestic)
    } else {
        None
    }
}

/// Mask the middle block of a normalized number for display, e.g.
/// `01012345678` becomes `010-****-5678`.
pub fn mask_phone(normalized: &str) -> String {
    let len = normalized.len();
    if len < 8 {
        return "*".repeat(len);
    }
    let head_len = if normalized.starts_with("02") { 2 } else { 3 };
    let tail = &normalized[len - 4..];
    let middle_len = len - head_len - 4;
    format!(
        "{}-{}-{}",
        &normalized[..head_len],
        "*".repeat(middle_len),
        tail
    )
}
