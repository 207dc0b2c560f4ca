//! Repository for the `passport_submissions` and `passport_guests` tables.

use cruisemall_core::passport::SubmissionStatus;
use cruisemall_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::passport::{
    CreatePassportSubmission, NewPassportGuest, PassportGuest, PassportSubmission,
    PassportSubmissionWithGuests,
};

const COLUMNS: &str =
    "id, order_id, token, status, expires_at, submitted_at, created_by, created_at, updated_at";

const GUEST_COLUMNS: &str = "id, submission_id, korean_name, english_surname, english_given_name, \
                              passport_number, birth_date, expiry_date, gender, nationality, \
                              created_at, updated_at";

/// Provides persistence for token-gated passport submissions.
pub struct PassportRepo;

impl PassportRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreatePassportSubmission,
    ) -> Result<PassportSubmission, sqlx::Error> {
        let query = format!(
            "INSERT INTO passport_submissions (order_id, token, expires_at, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PassportSubmission>(&query)
            .bind(input.order_id)
            .bind(&input.token)
            .bind(input.expires_at)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PassportSubmission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM passport_submissions WHERE id = $1");
        sqlx::query_as::<_, PassportSubmission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<PassportSubmission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM passport_submissions WHERE token = $1");
        sqlx::query_as::<_, PassportSubmission>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Submissions for an order, newest first.
    pub async fn list_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<PassportSubmission>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM passport_submissions
             WHERE order_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, PassportSubmission>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    pub async fn guests(
        pool: &PgPool,
        submission_id: DbId,
    ) -> Result<Vec<PassportGuest>, sqlx::Error> {
        let query = format!(
            "SELECT {GUEST_COLUMNS} FROM passport_guests WHERE submission_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, PassportGuest>(&query)
            .bind(submission_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_with_guests(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PassportSubmissionWithGuests>, sqlx::Error> {
        let Some(submission) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let guests = Self::guests(pool, id).await?;
        Ok(Some(PassportSubmissionWithGuests { submission, guests }))
    }

    /// Store the guests of a pending submission and mark it submitted.
    ///
    /// Any previously stored guests are replaced. Returns `None` when the
    /// submission is no longer pending.
    pub async fn submit(
        pool: &PgPool,
        id: DbId,
        guests: &[NewPassportGuest],
    ) -> Result<Option<PassportSubmissionWithGuests>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE passport_submissions SET status = $2, submitted_at = NOW()
             WHERE id = $1 AND status = $3
             RETURNING {COLUMNS}"
        );
        let submission = sqlx::query_as::<_, PassportSubmission>(&query)
            .bind(id)
            .bind(SubmissionStatus::Submitted.as_str())
            .bind(SubmissionStatus::Pending.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(submission) = submission else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM passport_guests WHERE submission_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO passport_guests
                (submission_id, korean_name, english_surname, english_given_name,
                 passport_number, birth_date, expiry_date, gender, nationality)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {GUEST_COLUMNS}"
        );
        let mut stored = Vec::with_capacity(guests.len());
        for guest in guests {
            let row = sqlx::query_as::<_, PassportGuest>(&insert)
                .bind(id)
                .bind(&guest.korean_name)
                .bind(&guest.english_surname)
                .bind(&guest.english_given_name)
                .bind(&guest.passport_number)
                .bind(guest.birth_date)
                .bind(guest.expiry_date)
                .bind(&guest.gender)
                .bind(&guest.nationality)
                .fetch_one(&mut *tx)
                .await?;
            stored.push(row);
        }

        tx.commit().await?;
        Ok(Some(PassportSubmissionWithGuests {
            submission,
            guests: stored,
        }))
    }

    /// Flip pending submissions whose link has lapsed to `EXPIRED`.
    pub async fn expire_lapsed(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE passport_submissions SET status = $1
             WHERE status = $2 AND expires_at <= $3",
        )
        .bind(SubmissionStatus::Expired.as_str())
        .bind(SubmissionStatus::Pending.as_str())
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark a single submission expired.
    pub async fn mark_expired(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE passport_submissions SET status = $2 WHERE id = $1 AND status = $3")
            .bind(id)
            .bind(SubmissionStatus::Expired.as_str())
            .bind(SubmissionStatus::Pending.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }
}
