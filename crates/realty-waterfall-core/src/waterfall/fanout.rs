use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::ownership::{OwnerKind, OwnershipGraph};
use crate::types::{round_money, Money, Percent};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One tier's absorbed amount spread over the ownership graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fanout {
    pub absorbed: Money,
    pub entities: Vec<EntityShare>,
    /// Amount no owner record claims (owners holding < 100% of an entity)
    pub unattributed: Money,
}

/// An entity investment's slice of a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityShare {
    pub entity_investment_id: String,
    pub entity_name: String,
    /// Share of the property
    pub ownership_percentage: Percent,
    pub amount: Money,
    pub owners: Vec<OwnerShare>,
    pub unattributed: Money,
}

/// An owner's slice of its entity's share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerShare {
    pub owner_id: String,
    pub holder: OwnerKind,
    /// Share of the entity investment
    pub ownership_percentage: Percent,
    pub amount: Money,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Split `absorbed` across entity investments by property ownership, then
/// across each entity's owners by entity ownership.
///
/// Property percentages are normalised by their sum. Owner percentages are
/// normalised against `max(Σ owner %, 100)`, so owners holding less than 100%
/// leave an explicit unattributed remainder. Nested investing entities get a
/// single line. Every level rounds to `dp` places with banker's rounding and
/// hands the residual to its largest recipient, so
/// `Σ owners + Σ unattributed == absorbed` exactly.
pub fn fan_out(absorbed: Money, graph: &OwnershipGraph, dp: u32) -> Fanout {
    let entity_weights: Vec<Decimal> = graph
        .entity_investments
        .iter()
        .map(|ei| ei.ownership_percentage)
        .collect();
    let entity_amounts = apportion(absorbed, &entity_weights, dp);

    let mut entities = Vec::with_capacity(entity_amounts.len());
    let mut unattributed_total = Decimal::ZERO;

    for (ei, share) in graph.entity_investments.iter().zip(entity_amounts) {
        let attributed_pct = ei.owners_percentage();
        let owners_target = if attributed_pct >= Decimal::ONE_HUNDRED {
            share
        } else {
            round_money(share * attributed_pct / Decimal::ONE_HUNDRED, dp)
        };
        let unattributed = share - owners_target;

        let owner_weights: Vec<Decimal> =
            ei.owners.iter().map(|o| o.ownership_percentage).collect();
        let owner_amounts = apportion(owners_target, &owner_weights, dp);

        let owners = ei
            .owners
            .iter()
            .zip(owner_amounts)
            .map(|(owner, amount)| OwnerShare {
                owner_id: owner.id.clone(),
                holder: owner.holder.clone(),
                ownership_percentage: owner.ownership_percentage,
                amount,
            })
            .collect();

        unattributed_total += unattributed;
        entities.push(EntityShare {
            entity_investment_id: ei.id.clone(),
            entity_name: ei.entity_name.clone(),
            ownership_percentage: ei.ownership_percentage,
            amount: share,
            owners,
            unattributed,
        });
    }

    // A graph with no positive weights cannot hold the money at all.
    if entities.iter().all(|e| e.amount.is_zero()) && !absorbed.is_zero() {
        unattributed_total = absorbed;
    }

    Fanout {
        absorbed,
        entities,
        unattributed: unattributed_total,
    }
}

/// Split `total` in proportion to `weights`, rounding each part to `dp`
/// places. Parts are floored, then the leftover minor units go out one at a
/// time by largest fractional remainder, larger weight first on ties, so no
/// part drops below zero. Zero total weight yields all-zero parts.
pub fn apportion(total: Money, weights: &[Decimal], dp: u32) -> Vec<Money> {
    let weight_sum: Decimal = weights.iter().sum();
    if weights.is_empty() || weight_sum <= Decimal::ZERO {
        return vec![Decimal::ZERO; weights.len()];
    }

    let exact: Vec<Decimal> = weights.iter().map(|w| total * *w / weight_sum).collect();
    let mut parts: Vec<Money> = exact
        .iter()
        .map(|x| x.round_dp_with_strategy(dp, RoundingStrategy::ToNegativeInfinity))
        .collect();

    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|&a, &b| {
        (exact[b] - parts[b])
            .cmp(&(exact[a] - parts[a]))
            .then_with(|| weights[b].cmp(&weights[a]))
            .then_with(|| a.cmp(&b))
    });

    let unit = Decimal::new(1, dp);
    let mut leftover = total - parts.iter().sum::<Decimal>();
    for &i in order.iter().cycle() {
        if leftover < unit {
            break;
        }
        parts[i] += unit;
        leftover -= unit;
    }
    // Totals finer than `dp` keep their sub-unit tail on the first part in order.
    if !leftover.is_zero() {
        parts[order[0]] += leftover;
    }
    parts
}
