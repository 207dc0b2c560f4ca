//! Commission split between agents and branch managers.
//!
//! Rates come from the affiliate profiles involved in the sale. Every share
//! carries its own business-income withholding, so payouts can be reported
//! per recipient.

use serde::Serialize;

use crate::error::CoreError;
use crate::ownership::LeadOwner;
use crate::tax::{withholding, Withholding};
use crate::types::{apply_bps, Bps, DbId, Won};

/// Highest commission rate accepted on a profile (50%).
pub const MAX_COMMISSION_BPS: Bps = 5_000;

/// Rates that apply to one sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommissionRates {
    /// The selling agent's own rate.
    pub agent_rate_bps: Bps,
    /// The manager's rate on leads they sell directly.
    pub manager_rate_bps: Bps,
    /// The manager's override on leads sold by one of their agents.
    pub manager_override_bps: Bps,
}

/// One recipient's share of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommissionShare {
    pub profile_id: DbId,
    pub rate_bps: Bps,
    pub withholding: Withholding,
}

impl CommissionShare {
    pub fn gross(&self) -> Won {
        self.withholding.gross
    }
}

/// The full split of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommissionSplit {
    pub sale_amount: Won,
    pub agent: Option<CommissionShare>,
    pub manager: Option<CommissionShare>,
}

impl CommissionSplit {
    /// Total gross commission paid out on this sale.
    pub fn total_gross(&self) -> Won {
        self.agent.map_or(0, |s| s.gross()) + self.manager.map_or(0, |s| s.gross())
    }

    /// Total withholding tax across both shares.
    pub fn total_withholding(&self) -> Won {
        self.agent.map_or(0, |s| s.withholding.total)
            + self.manager.map_or(0, |s| s.withholding.total)
    }
}

/// Validate a rate entered on an affiliate profile.
pub fn validate_rate(rate_bps: Bps, field: &str) -> Result<(), CoreError> {
    if !(0..=MAX_COMMISSION_BPS).contains(&rate_bps) {
        return Err(CoreError::Validation(format!(
            "{field} must be between 0 and {MAX_COMMISSION_BPS} basis points (got {rate_bps})"
        )));
    }
    Ok(())
}

fn share(profile_id: DbId, sale_amount: Won, rate_bps: Bps) -> Result<CommissionShare, CoreError> {
    Ok(CommissionShare {
        profile_id,
        rate_bps,
        withholding: withholding(apply_bps(sale_amount, rate_bps))?,
    })
}

/// Split the commission on a sale according to who owns the lead.
///
/// - Agent-owned: the agent earns `agent_rate_bps`, the agent's manager (if
///   any) earns `manager_override_bps`.
/// - Manager-owned: the manager earns `manager_rate_bps`.
/// - Headquarters: no commission.
pub fn split_commission(
    sale_amount: Won,
    owner: LeadOwner,
    rates: CommissionRates,
) -> Result<CommissionSplit, CoreError> {
    if sale_amount < 0 {
        return Err(CoreError::Validation(format!(
            "sale_amount must not be negative (got {sale_amount})"
        )));
    }

    let (agent, manager) = match owner {
        LeadOwner::Agent {
            agent_id,
            manager_id,
        } => (
            Some(share(agent_id, sale_amount, rates.agent_rate_bps)?),
            manager_id
                .map(|id| share(id, sale_amount, rates.manager_override_bps))
                .transpose()?,
        ),
        LeadOwner::Manager { manager_id } => (
            None,
            Some(share(manager_id, sale_amount, rates.manager_rate_bps)?),
        ),
        LeadOwner::Headquarters => (None, None),
    };

    Ok(CommissionSplit {
        sale_amount,
        agent,
        manager,
    })
}

/// Totals over a set of payouts for one recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommissionSummary {
    pub sale_count: i64,
    pub sales_total: Won,
    pub gross: Won,
    pub withholding: Won,
    pub net: Won,
}

/// Sum `(sale_amount, gross_commission)` pairs, recomputing withholding per
/// payout so rounding matches what each payout statement shows.
pub fn summarize<I>(payouts: I) -> Result<CommissionSummary, CoreError>
where
    I: IntoIterator<Item = (Won, Won)>,
{
    let mut summary = CommissionSummary::default();
    for (sale_amount, gross) in payouts {
        let w = withholding(gross)?;
        summary.sale_count += 1;
        summary.sales_total += sale_amount;
        summary.gross += w.gross;
        summary.withholding += w.total;
        summary.net += w.net;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> CommissionRates {
        CommissionRates {
            agent_rate_bps: 500,
            manager_rate_bps: 700,
            manager_override_bps: 200,
        }
    }

    #[test]
    fn agent_sale_pays_agent_and_override() {
        let owner = LeadOwner::Agent {
            agent_id: 7,
            manager_id: Some(3),
        };
        let split = split_commission(2_000_000, owner, rates()).unwrap();

        let agent = split.agent.unwrap();
        assert_eq!(agent.profile_id, 7);
        assert_eq!(agent.gross(), 100_000);
        assert_eq!(agent.withholding.total, 3_300);

        let manager = split.manager.unwrap();
        assert_eq!(manager.profile_id, 3);
        assert_eq!(manager.gross(), 40_000);

        assert_eq!(split.total_gross(), 140_000);
        assert_eq!(split.total_withholding(), 3_300 + 1_320);
    }

    #[test]
    fn agent_without_manager_pays_only_agent() {
        let owner = LeadOwner::Agent {
            agent_id: 7,
            manager_id: None,
        };
        let split = split_commission(1_000_000, owner, rates()).unwrap();
        assert!(split.manager.is_none());
        assert_eq!(split.total_gross(), 50_000);
    }

    #[test]
    fn manager_sale_uses_direct_rate() {
        let split =
            split_commission(1_000_000, LeadOwner::Manager { manager_id: 3 }, rates()).unwrap();
        assert!(split.agent.is_none());
        assert_eq!(split.manager.unwrap().gross(), 70_000);
    }

    #[test]
    fn headquarters_sale_pays_nothing() {
        let split = split_commission(1_000_000, LeadOwner::Headquarters, rates()).unwrap();
        assert_eq!(split.total_gross(), 0);
    }

    #[test]
    fn negative_sale_rejected() {
        assert!(split_commission(-1, LeadOwner::Headquarters, rates()).is_err());
    }

    #[test]
    fn rate_bounds() {
        assert!(validate_rate(0, "rate").is_ok());
        assert!(validate_rate(MAX_COMMISSION_BPS, "rate").is_ok());
        assert!(validate_rate(MAX_COMMISSION_BPS + 1, "rate").is_err());
        assert!(validate_rate(-1, "rate").is_err());
    }

    #[test]
    fn summary_totals() {
        let summary = summarize([(1_000_000, 50_000), (2_000_000, 100_000)]).unwrap();
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.sales_total, 3_000_000);
        assert_eq!(summary.gross, 150_000);
        assert_eq!(summary.withholding, 1_650 + 3_300);
        assert_eq!(summary.net, 150_000 - 4_950);
    }
}
