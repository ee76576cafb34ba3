use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::fanout::Fanout;
use super::netting::RefinanceNetting;
use super::ownership::{OwnerKind, OwnershipWarning};
use super::structure::TierType;
use super::tiers::TierAllocation;
use crate::types::{Money, Percent};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Audit-grade breakdown of one distribution. This is both the value handed
/// back to callers and the shape persisted for later retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub summary: ReportSummary,
    /// Tiers in processing order
    pub by_tier: Vec<TierBreakdown>,
    #[serde(default)]
    pub warnings: Vec<OwnershipWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Gross amount before any netting
    pub original_amount: Money,
    pub debt_subtracted: Money,
    /// Refinance financing costs (zero for other distribution types)
    pub fees_subtracted: Money,
    pub available_after_debt: Money,
    /// Sum of every tier's absorbed amount
    pub total_distributed: Money,
    /// Part of `total_distributed` no owner record claims
    pub unattributed_amount: Money,
    /// Pool left after the last tier; zero whenever a residual tier is reached
    pub undistributed_amount: Money,
    /// Tiers that absorbed a non-zero amount
    pub tiers_processed: usize,
    /// Distinct individuals with a non-zero allocation
    pub total_investors: usize,
    /// Distinct entity investments with a non-zero allocation
    pub total_entities: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinance: Option<RefinanceNetting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBreakdown {
    pub tier_name: String,
    pub tier_type: TierType,
    pub priority: i32,
    pub total_amount: Money,
    pub investors: Vec<InvestorLine>,
    pub entities: Vec<EntityLine>,
    pub unattributed: Money,
}

/// An individual's allocation within a tier, summed across every entity
/// investment the individual holds through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorLine {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub amount: Money,
}

/// A nested investing entity's allocation within a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityLine {
    pub entity_id: String,
    pub name: String,
    /// Share of the entity investment it holds
    pub ownership_percentage: Percent,
    pub entity_investment_id: String,
    pub amount: Money,
}

/// Netting figures that precede the tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportAmounts {
    pub original_amount: Money,
    pub debt_subtracted: Money,
    pub fees_subtracted: Money,
    pub available_after_debt: Money,
    pub refinance: Option<RefinanceNetting>,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Assemble the report from the tier allocations and their fan-outs.
///
/// `allocations` and `fanouts` are parallel: one fan-out per tier.
pub fn build_report(
    amounts: ReportAmounts,
    allocations: &[TierAllocation],
    fanouts: &[Fanout],
    warnings: Vec<OwnershipWarning>,
) -> DistributionReport {
    let mut by_tier = Vec::with_capacity(allocations.len());
    let mut investors_seen: HashSet<&str> = HashSet::new();
    let mut entities_seen: HashSet<&str> = HashSet::new();

    for (alloc, fanout) in allocations.iter().zip(fanouts) {
        let mut investors: Vec<InvestorLine> = Vec::new();
        let mut entities: Vec<EntityLine> = Vec::new();

        for share in &fanout.entities {
            if !share.amount.is_zero() {
                entities_seen.insert(share.entity_investment_id.as_str());
            }
            for owner in share.owners.iter().filter(|o| !o.amount.is_zero()) {
                match &owner.holder {
                    OwnerKind::Individual {
                        user_id,
                        name,
                        email,
                    } => {
                        investors_seen.insert(user_id.as_str());
                        match investors.iter_mut().find(|l| &l.user_id == user_id) {
                            Some(line) => line.amount += owner.amount,
                            None => investors.push(InvestorLine {
                                user_id: user_id.clone(),
                                name: name.clone(),
                                email: email.clone(),
                                amount: owner.amount,
                            }),
                        }
                    }
                    OwnerKind::InvestingEntity { entity_id, name } => {
                        entities.push(EntityLine {
                            entity_id: entity_id.clone(),
                            name: name.clone(),
                            ownership_percentage: owner.ownership_percentage,
                            entity_investment_id: share.entity_investment_id.clone(),
                            amount: owner.amount,
                        });
                    }
                }
            }
        }

        by_tier.push(TierBreakdown {
            tier_name: alloc.tier_name.clone(),
            tier_type: alloc.tier_type,
            priority: alloc.priority,
            total_amount: alloc.absorbed,
            investors,
            entities,
            unattributed: fanout.unattributed,
        });
    }

    let total_distributed: Money = allocations.iter().map(|a| a.absorbed).sum();
    let unattributed_amount: Money = fanouts.iter().map(|f| f.unattributed).sum();
    let tiers_processed = allocations.iter().filter(|a| !a.absorbed.is_zero()).count();
    let undistributed_amount = amounts.available_after_debt - total_distributed;

    DistributionReport {
        summary: ReportSummary {
            original_amount: amounts.original_amount,
            debt_subtracted: amounts.debt_subtracted,
            fees_subtracted: amounts.fees_subtracted,
            available_after_debt: amounts.available_after_debt,
            total_distributed,
            unattributed_amount,
            undistributed_amount,
            tiers_processed,
            total_investors: investors_seen.len(),
            total_entities: entities_seen.len(),
            refinance: amounts.refinance,
        },
        by_tier,
        warnings,
    }
}

impl DistributionReport {
    pub fn tier(&self, name: &str) -> Option<&TierBreakdown> {
        self.by_tier.iter().find(|t| t.tier_name == name)
    }

    /// Each individual's total across all tiers, in first-seen order.
    pub fn investor_totals(&self) -> Vec<InvestorLine> {
        let mut totals: Vec<InvestorLine> = Vec::new();
        for line in self.by_tier.iter().flat_map(|t| t.investors.iter()) {
            match totals.iter_mut().find(|l| l.user_id == line.user_id) {
                Some(existing) => existing.amount += line.amount,
                None => totals.push(line.clone()),
            }
        }
        totals
    }

    /// Amount actually attributed to owners (distributed minus unattributed).
    pub fn total_attributed(&self) -> Money {
        self.summary.total_distributed - self.summary.unattributed_amount
    }
}

impl TierBreakdown {
    /// Investors + nested entities + unattributed; equals `total_amount`.
    pub fn allocated_total(&self) -> Money {
        let investors: Decimal = self.investors.iter().map(|l| l.amount).sum();
        let entities: Decimal = self.entities.iter().map(|l| l.amount).sum();
        investors + entities + self.unattributed
    }
}
