use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::structure::{TierKind, TierType, WaterfallStructure};
use crate::error::DistributionError;
use crate::types::{pct, round_money, Money};
use crate::DistributionResult;

/// How much of the pool one tier absorbed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAllocation {
    pub tier_name: String,
    pub tier_type: TierType,
    pub priority: i32,
    /// What the tier asked for before being capped by the pool
    pub entitlement: Money,
    pub absorbed: Money,
    /// Pool left after this tier
    pub remaining: Money,
}

/// Walk the active tiers in ascending priority, letting each absorb
/// `min(remaining, entitlement)` of the pool.
///
/// Entitlements are flat per distribution event: no accrual between events
/// and no ledger of capital already returned is consulted. `capital_base` is
/// the capital contributed by all owners of the property. Every active tier
/// appears in the output; tiers reached after the pool is exhausted absorb
/// zero.
pub fn allocate_tiers(
    available: Money,
    structure: &WaterfallStructure,
    capital_base: Money,
    dp: u32,
) -> DistributionResult<Vec<TierAllocation>> {
    if available < Decimal::ZERO {
        return Err(DistributionError::invalid(
            "available_after_debt",
            "Distributable amount cannot be negative",
        ));
    }
    if capital_base < Decimal::ZERO {
        return Err(DistributionError::invalid(
            "capital_base",
            "Invested capital cannot be negative",
        ));
    }
    structure.validate()?;

    let mut remaining = available;
    // Preferred return paid so far in this distribution; drives catch-up.
    let mut cumulative_preferred = Decimal::ZERO;
    let mut allocations = Vec::new();

    for tier in structure.ordered_tiers() {
        let entitlement = match tier.kind {
            TierKind::PreferredReturn { return_rate } => {
                round_money(capital_base * pct(return_rate), dp)
            }
            TierKind::CatchUp {
                catch_up_percentage,
            } => round_money(cumulative_preferred * pct(catch_up_percentage), dp),
            TierKind::Promote { promote_percentage } => {
                round_money(remaining * pct(promote_percentage), dp)
            }
            TierKind::Residual => remaining,
            TierKind::ReturnOfCapital => capital_base,
        };

        let absorbed = remaining.min(entitlement).max(Decimal::ZERO);
        remaining -= absorbed;
        if let TierKind::PreferredReturn { .. } = tier.kind {
            cumulative_preferred += absorbed;
        }

        allocations.push(TierAllocation {
            tier_name: tier.tier_name.clone(),
            tier_type: tier.kind.tier_type(),
            priority: tier.priority,
            entitlement,
            absorbed,
            remaining,
        });
    }

    Ok(allocations)
}
