//! Product margin calculator.
//!
//! Margin is measured against the supply value (price net of VAT) after
//! subtracting cost, affiliate commission, and the card processor's fee on
//! the charged amount.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::tax::{vat_from_inclusive, VAT_BPS};
use crate::types::{apply_bps, ensure_amount, Bps, Won, BPS_DENOMINATOR, MAX_AMOUNT};

/// Default card processing fee (2.5%).
pub const DEFAULT_CARD_FEE_BPS: Bps = 250;

/// Inputs to [`calculate_margin`].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MarginInput {
    pub sale_price: Won,
    pub cost_price: Won,
    #[serde(default)]
    pub commission: Won,
    #[serde(default = "default_card_fee")]
    pub card_fee_bps: Bps,
    /// Whether `sale_price` includes 10% VAT.
    #[serde(default = "default_true")]
    pub vat_inclusive: bool,
}

fn default_card_fee() -> Bps {
    DEFAULT_CARD_FEE_BPS
}

fn default_true() -> bool {
    true
}

/// Result of [`calculate_margin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarginBreakdown {
    pub sale_price: Won,
    pub supply_value: Won,
    pub vat: Won,
    pub card_fee: Won,
    pub commission: Won,
    pub cost: Won,
    pub margin: Won,
    /// Margin as a share of the supply value, in basis points. Negative when
    /// the product sells at a loss.
    pub margin_rate_bps: Bps,
}

fn validate(input: &MarginInput) -> Result<(), CoreError> {
    ensure_amount(input.sale_price, "sale_price")?;
    validate_costs(input.cost_price, input.commission, input.card_fee_bps)
}

fn validate_costs(cost_price: Won, commission: Won, card_fee_bps: Bps) -> Result<(), CoreError> {
    ensure_amount(cost_price, "cost_price")?;
    ensure_amount(commission, "commission")?;
    if !(0..BPS_DENOMINATOR).contains(&card_fee_bps) {
        return Err(CoreError::Validation(format!(
            "card_fee_bps must be between 0 and {} (got {card_fee_bps})",
            BPS_DENOMINATOR - 1
        )));
    }
    Ok(())
}

/// Break a sale price down into VAT, fees, commission, cost, and margin.
pub fn calculate_margin(input: MarginInput) -> Result<MarginBreakdown, CoreError> {
    validate(&input)?;

    let (supply_value, vat) = if input.vat_inclusive {
        let split = vat_from_inclusive(input.sale_price)?;
        (split.supply, split.vat)
    } else {
        (input.sale_price, 0)
    };

    let card_fee = apply_bps(input.sale_price, input.card_fee_bps);
    let margin = supply_value - input.cost_price - input.commission - card_fee;
    let margin_rate_bps = if supply_value > 0 {
        margin * BPS_DENOMINATOR / supply_value
    } else {
        0
    };

    Ok(MarginBreakdown {
        sale_price: input.sale_price,
        supply_value,
        vat,
        card_fee,
        commission: input.commission,
        cost: input.cost_price,
        margin,
        margin_rate_bps,
    })
}

/// Lowest sale price that reaches `target_bps` margin.
///
/// Solves `(supply(P) - cost - commission - fee(P)) / supply(P) >= target`
/// for `P`, then nudges the result upward to absorb rounding in the VAT
/// split.
pub fn price_for_target_margin(
    cost_price: Won,
    commission: Won,
    card_fee_bps: Bps,
    target_bps: Bps,
    vat_inclusive: bool,
) -> Result<Won, CoreError> {
    validate_costs(cost_price, commission, card_fee_bps)?;
    if !(0..BPS_DENOMINATOR).contains(&target_bps) {
        return Err(CoreError::Validation(format!(
            "target margin must be between 0 and {} basis points (got {target_bps})",
            BPS_DENOMINATOR - 1
        )));
    }

    let vat_denominator = if vat_inclusive {
        BPS_DENOMINATOR + VAT_BPS
    } else {
        BPS_DENOMINATOR
    } as i128;
    let base = BPS_DENOMINATOR as i128;
    let divisor = (base - target_bps as i128) * base - card_fee_bps as i128 * vat_denominator;
    if divisor <= 0 {
        return Err(CoreError::Validation(
            "target margin is unreachable once card fees are deducted".to_string(),
        ));
    }

    let fixed = i128::from(cost_price) + i128::from(commission);
    let numerator = fixed * vat_denominator * base;
    let mut price = Won::try_from((numerator + divisor - 1) / divisor)
        .ok()
        .filter(|price| *price <= MAX_AMOUNT)
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "target price would exceed the maximum amount of {MAX_AMOUNT}"
            ))
        })?;

    for _ in 0..16 {
        let breakdown = calculate_margin(MarginInput {
            sale_price: price,
            cost_price,
            commission,
            card_fee_bps,
            vat_inclusive,
        })?;
        if breakdown.margin_rate_bps >= target_bps && breakdown.margin >= 0 {
            break;
        }
        price += 1;
    }

    Ok(price)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn input(sale_price: Won, cost_price: Won) -> MarginInput {
        MarginInput {
            sale_price,
            cost_price,
            commission: 0,
            card_fee_bps: 0,
            vat_inclusive: true,
        }
    }

    #[test]
    fn vat_inclusive_margin() {
        let b = calculate_margin(input(1_100_000, 800_000)).unwrap();
        assert_eq!(b.supply_value, 1_000_000);
        assert_eq!(b.vat, 100_000);
        assert_eq!(b.margin, 200_000);
        assert_eq!(b.margin_rate_bps, 2_000);
    }

    #[test]
    fn fees_and_commission_reduce_margin() {
        let b = calculate_margin(MarginInput {
            sale_price: 1_100_000,
            cost_price: 800_000,
            commission: 50_000,
            card_fee_bps: 250,
            vat_inclusive: true,
        })
        .unwrap();
        assert_eq!(b.card_fee, 27_500);
        assert_eq!(b.margin, 1_000_000 - 800_000 - 50_000 - 27_500);
    }

    #[test]
    fn loss_has_negative_rate() {
        let b = calculate_margin(MarginInput {
            vat_inclusive: false,
            ..input(1_000_000, 1_200_000)
        })
        .unwrap();
        assert_eq!(b.margin, -200_000);
        assert_eq!(b.margin_rate_bps, -2_000);
    }

    #[test]
    fn zero_price_has_zero_rate() {
        let b = calculate_margin(input(0, 0)).unwrap();
        assert_eq!(b.margin_rate_bps, 0);
    }

    #[test]
    fn rejects_negative_inputs() {
        assert!(calculate_margin(input(-1, 0)).is_err());
        assert!(calculate_margin(input(1, -1)).is_err());
    }

    #[test]
    fn target_price_reaches_target() {
        let price = price_for_target_margin(800_000, 50_000, 250, 1_500, true).unwrap();
        let b = calculate_margin(MarginInput {
            sale_price: price,
            cost_price: 800_000,
            commission: 50_000,
            card_fee_bps: 250,
            vat_inclusive: true,
        })
        .unwrap();
        assert!(b.margin_rate_bps >= 1_500);

        let cheaper = calculate_margin(MarginInput {
            sale_price: price - 100,
            cost_price: 800_000,
            commission: 50_000,
            card_fee_bps: 250,
            vat_inclusive: true,
        })
        .unwrap();
        assert!(cheaper.margin_rate_bps < 1_500);
    }

    #[test]
    fn target_price_without_vat() {
        // (P - 900_000) / P >= 10%  =>  P >= 1_000_000
        let price = price_for_target_margin(900_000, 0, 0, 1_000, false).unwrap();
        assert_eq!(price, 1_000_000);
    }

    #[test]
    fn target_price_validates_costs() {
        assert_matches!(
            price_for_target_margin(-1, 0, 250, 1_000, true),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            price_for_target_margin(100, -1, 250, 1_000, true),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            price_for_target_margin(100, 0, -250, 1_000, true),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn huge_costs_do_not_overflow() {
        assert_matches!(
            calculate_margin(input(Won::MAX, 0)),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            price_for_target_margin(MAX_AMOUNT, MAX_AMOUNT, 0, 5_000, true),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            price_for_target_margin(Won::MAX, Won::MAX, 0, 0, true),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn unreachable_target_rejected() {
        assert!(price_for_target_margin(100, 0, 9_000, 5_000, false).is_err());
        assert!(price_for_target_margin(100, 0, 0, 10_000, false).is_err());
    }
}
