use crate::error::CoreError;

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Monetary amounts in Korean won. The won has no minor unit, so every
/// amount is a whole number.
pub type Won = i64;

/// Rates are expressed in basis points (1/100 of a percent).
pub type Bps = i64;

/// Denominator for basis-point arithmetic.
pub const BPS_DENOMINATOR: i64 = 10_000;

/// Largest amount accepted from callers (100 trillion won). Keeps every
/// basis-point product well inside `i64`.
pub const MAX_AMOUNT: Won = 100_000_000_000_000;

/// Apply a basis-point rate to an amount, truncating toward zero. The
/// product is taken in `i128` and the result saturates at the `i64` range.
pub fn apply_bps(amount: Won, rate_bps: Bps) -> Won {
    let scaled = i128::from(amount) * i128::from(rate_bps) / i128::from(BPS_DENOMINATOR);
    scaled.clamp(i128::from(Won::MIN), i128::from(Won::MAX)) as Won
}

/// Check that a caller-supplied amount lies in `0..=MAX_AMOUNT`.
pub fn ensure_amount(amount: Won, field: &str) -> Result<Won, CoreError> {
    if amount < 0 {
        return Err(CoreError::Validation(format!(
            "{field} must not be negative (got {amount})"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(CoreError::Validation(format!(
            "{field} must not exceed {MAX_AMOUNT} (got {amount})"
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_bps_truncates() {
        assert_eq!(apply_bps(1_000_000, 330), 33_000);
        assert_eq!(apply_bps(999, 1_000), 99);
        assert_eq!(apply_bps(0, 500), 0);
    }

    #[test]
    fn apply_bps_saturates_instead_of_overflowing() {
        assert_eq!(apply_bps(Won::MAX, 10_000), Won::MAX);
        assert_eq!(apply_bps(Won::MAX, 20_000), Won::MAX);
        assert_eq!(apply_bps(MAX_AMOUNT, 11_000), 110_000_000_000_000);
    }

    #[test]
    fn amounts_are_bounded() {
        assert_eq!(ensure_amount(MAX_AMOUNT, "amount").unwrap(), MAX_AMOUNT);
        assert!(ensure_amount(MAX_AMOUNT + 1, "amount").is_err());
        assert!(ensure_amount(-1, "amount").is_err());
    }
}
