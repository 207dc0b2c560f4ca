//! Passport submission and guest models.

use chrono::NaiveDate;
use cruisemall_core::passport::GuestInput;
use cruisemall_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `passport_submissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PassportSubmission {
    pub id: DbId,
    pub order_id: DbId,
    pub token: String,
    pub status: String,
    pub expires_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `passport_guests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PassportGuest {
    pub id: DbId,
    pub submission_id: DbId,
    pub korean_name: Option<String>,
    pub english_surname: String,
    pub english_given_name: String,
    pub passport_number: String,
    pub birth_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub gender: String,
    pub nationality: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PassportGuest {
    /// Name as printed on the passport.
    pub fn full_english_name(&self) -> String {
        format!("{} {}", self.english_surname, self.english_given_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassportSubmissionWithGuests {
    #[serde(flatten)]
    pub submission: PassportSubmission,
    pub guests: Vec<PassportGuest>,
}

/// DTO for opening a submission.
#[derive(Debug, Clone)]
pub struct CreatePassportSubmission {
    pub order_id: DbId,
    pub token: String,
    pub expires_at: Timestamp,
    pub created_by: Option<DbId>,
}

/// Guests are inserted from the validated form input directly.
pub type NewPassportGuest = GuestInput;
