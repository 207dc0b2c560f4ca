//! Korean tax arithmetic: progressive income tax, business-income
//! withholding on affiliate payouts, and VAT splits.
//!
//! All amounts are whole won. Withheld amounts are truncated to the 10-won
//! unit as the tax office does.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{apply_bps, ensure_amount, Bps, Won};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// National business-income withholding rate (3%).
pub const WITHHOLDING_NATIONAL_BPS: Bps = 300;

/// Local income tax as a share of the national tax (10%).
pub const LOCAL_TAX_SHARE_BPS: Bps = 1_000;

/// Standard VAT rate (10%).
pub const VAT_BPS: Bps = 1_000;

/// A single progressive bracket, expressed in the "rate minus progressive
/// deduction" form used by the national tax service tables.
#[derive(Debug, Clone, Copy)]
pub struct TaxBracket {
    /// Upper bound of taxable income covered by this bracket (inclusive).
    /// `None` for the top bracket.
    pub upper: Option<Won>,
    pub rate_bps: Bps,
    pub progressive_deduction: Won,
}

/// Comprehensive income tax brackets.
pub const INCOME_TAX_BRACKETS: [TaxBracket; 8] = [
    TaxBracket { upper: Some(14_000_000), rate_bps: 600, progressive_deduction: 0 },
    TaxBracket { upper: Some(50_000_000), rate_bps: 1_500, progressive_deduction: 1_260_000 },
    TaxBracket { upper: Some(88_000_000), rate_bps: 2_400, progressive_deduction: 5_760_000 },
    TaxBracket { upper: Some(150_000_000), rate_bps: 3_500, progressive_deduction: 15_440_000 },
    TaxBracket { upper: Some(300_000_000), rate_bps: 3_800, progressive_deduction: 19_940_000 },
    TaxBracket { upper: Some(500_000_000), rate_bps: 4_000, progressive_deduction: 25_940_000 },
    TaxBracket { upper: Some(1_000_000_000), rate_bps: 4_200, progressive_deduction: 35_940_000 },
    TaxBracket { upper: None, rate_bps: 4_500, progressive_deduction: 65_940_000 },
];

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Business-income withholding on a single payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Withholding {
    pub gross: Won,
    pub national: Won,
    pub local: Won,
    pub total: Won,
    pub net: Won,
}

/// Annual income tax on a taxable income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncomeTax {
    pub taxable_income: Won,
    pub national: Won,
    pub local: Won,
    pub total: Won,
    pub marginal_rate_bps: Bps,
}

/// A VAT-inclusive amount split into supply value and VAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VatSplit {
    pub supply: Won,
    pub vat: Won,
    pub total: Won,
}

// ---------------------------------------------------------------------------
// Calculations
// ---------------------------------------------------------------------------

/// Truncate an amount down to the 10-won unit.
pub fn truncate_to_ten(amount: Won) -> Won {
    amount - amount % 10
}

/// Business-income withholding (3% national + 0.3% local) on a payout.
pub fn withholding(gross: Won) -> Result<Withholding, CoreError> {
    ensure_amount(gross, "amount")?;
    let national = truncate_to_ten(apply_bps(gross, WITHHOLDING_NATIONAL_BPS));
    let local = truncate_to_ten(apply_bps(national, LOCAL_TAX_SHARE_BPS));
    let total = national + local;
    Ok(Withholding {
        gross,
        national,
        local,
        total,
        net: gross - total,
    })
}

/// Find the bracket that applies to `taxable_income`.
pub fn bracket_for(taxable_income: Won) -> &'static TaxBracket {
    INCOME_TAX_BRACKETS
        .iter()
        .find(|b| b.upper.map_or(true, |upper| taxable_income <= upper))
        .unwrap_or(&INCOME_TAX_BRACKETS[INCOME_TAX_BRACKETS.len() - 1])
}

/// Progressive income tax plus local income tax on an annual taxable income.
pub fn income_tax(taxable_income: Won) -> Result<IncomeTax, CoreError> {
    ensure_amount(taxable_income, "taxable_income")?;
    let bracket = bracket_for(taxable_income);
    let national = (apply_bps(taxable_income, bracket.rate_bps) - bracket.progressive_deduction)
        .max(0);
    let national = truncate_to_ten(national);
    let local = truncate_to_ten(apply_bps(national, LOCAL_TAX_SHARE_BPS));
    Ok(IncomeTax {
        taxable_income,
        national,
        local,
        total: national + local,
        marginal_rate_bps: bracket.rate_bps,
    })
}

/// Split a VAT-inclusive amount. The supply value is rounded to the nearest
/// won and VAT takes the remainder, so `supply + vat == total` always holds.
pub fn vat_from_inclusive(total: Won) -> Result<VatSplit, CoreError> {
    ensure_amount(total, "amount")?;
    let denominator = 10_000 + VAT_BPS;
    let supply = (total * 10_000 + denominator / 2) / denominator;
    Ok(VatSplit {
        supply,
        vat: total - supply,
        total,
    })
}

/// Add VAT on top of a supply value.
pub fn vat_on_supply(supply: Won) -> Result<VatSplit, CoreError> {
    ensure_amount(supply, "amount")?;
    let vat = apply_bps(supply, VAT_BPS);
    Ok(VatSplit {
        supply,
        vat,
        total: supply + vat,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
