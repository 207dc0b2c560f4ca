//! Passport submission rules.
//!
//! A submission is created for an order and shared as a tokenized link. The
//! traveler fills in one entry per guest; each entry is validated against the
//! departure date of the cruise.

use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Passports must stay valid this many months past departure.
pub const MIN_VALIDITY_MONTHS_AFTER_DEPARTURE: u32 = 6;

/// Default lifetime of a submission link.
pub const DEFAULT_LINK_TTL_DAYS: i64 = 14;

/// Maximum guests on one submission.
pub const MAX_GUESTS: usize = 10;

static PASSPORT_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}[0-9]{7,8}$").expect("valid regex"));

static ENGLISH_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]+( [A-Z]+)*$").expect("valid regex"));

/// Status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Submitted,
    Expired,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "SUBMITTED" => Some(Self::Submitted),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// One guest's passport details as entered on the form.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuestInput {
    pub korean_name: Option<String>,
    pub english_surname: String,
    pub english_given_name: String,
    pub passport_number: String,
    pub birth_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub gender: String,
    pub nationality: Option<String>,
}

impl GuestInput {
    /// Uppercase and trim the fields travelers commonly enter loosely.
    pub fn normalized(mut self) -> Self {
        self.english_surname = collapse_spaces(&self.english_surname.to_uppercase());
        self.english_given_name = collapse_spaces(&self.english_given_name.to_uppercase());
        self.passport_number = self.passport_number.trim().to_uppercase();
        self.gender = self.gender.trim().to_uppercase();
        self.nationality = self
            .nationality
            .map(|n| n.trim().to_uppercase())
            .filter(|n| !n.is_empty());
        self.korean_name = self
            .korean_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self
    }
}

fn collapse_spaces(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate a normalized guest entry against the departure date.
pub fn validate_guest(
    guest: &GuestInput,
    departure_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), CoreError> {
    if !ENGLISH_NAME_RE.is_match(&guest.english_surname)
        || !ENGLISH_NAME_RE.is_match(&guest.english_given_name)
    {
        return Err(CoreError::Validation(
            "English name must contain only letters A-Z and spaces".to_string(),
        ));
    }
    if !PASSPORT_NO_RE.is_match(&guest.passport_number) {
        return Err(CoreError::Validation(format!(
            "Invalid passport number: {}",
            guest.passport_number
        )));
    }
    if guest.birth_date >= today {
        return Err(CoreError::Validation(
            "birth_date must be in the past".to_string(),
        ));
    }
    let min_expiry = departure_date
        .checked_add_months(Months::new(MIN_VALIDITY_MONTHS_AFTER_DEPARTURE))
        .ok_or_else(|| CoreError::Validation("departure date out of range".to_string()))?;
    if guest.expiry_date < min_expiry {
        return Err(CoreError::Validation(format!(
            "Passport {} expires {}; it must be valid until at least {min_expiry}",
            guest.passport_number, guest.expiry_date
        )));
    }
    if guest.gender != "M" && guest.gender != "F" {
        return Err(CoreError::Validation(
            "gender must be 'M' or 'F'".to_string(),
        ));
    }
    Ok(())
}

/// Validate a whole submission: guest count, per-guest rules, and no
/// passport number repeated.
pub fn validate_guests(
    guests: &[GuestInput],
    departure_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), CoreError> {
    if guests.is_empty() {
        return Err(CoreError::Validation(
            "At least one guest is required".to_string(),
        ));
    }
    if guests.len() > MAX_GUESTS {
        return Err(CoreError::Validation(format!(
            "At most {MAX_GUESTS} guests per submission"
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for guest in guests {
        validate_guest(guest, departure_date, today)?;
        if !seen.insert(guest.passport_number.as_str()) {
            return Err(CoreError::Validation(format!(
                "Passport number {} appears more than once",
                guest.passport_number
            )));
        }
    }
    Ok(())
}

/// Whether a submission link can no longer be used.
pub fn is_link_expired(expires_at: Timestamp, now: Timestamp) -> bool {
    now >= expires_at
}
