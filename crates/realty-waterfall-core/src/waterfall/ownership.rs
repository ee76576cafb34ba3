use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DistributionError;
use crate::types::{Money, Percent};
use crate::DistributionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Read-only snapshot of one property's capital structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipGraph {
    pub property_id: String,
    pub entity_investments: Vec<EntityInvestment>,
}

/// One investing entity's stake in the property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInvestment {
    pub id: String,
    pub entity_id: String,
    pub entity_name: String,
    pub investment_amount: Money,
    /// Share of the property
    pub ownership_percentage: Percent,
    pub investment_date: NaiveDate,
    #[serde(default)]
    pub status: InvestmentStatus,
    #[serde(default)]
    pub owners: Vec<Owner>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestmentStatus {
    #[default]
    Active,
    Pending,
    Exited,
}

/// A holder of a share of an entity investment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub holder: OwnerKind,
    /// Share of the entity investment
    pub ownership_percentage: Percent,
    pub investment_amount: Money,
    /// Authoritative line-item decomposition of `investment_amount`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<CapitalLineItem>>,
}

/// Who holds an owner record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerKind {
    Individual {
        user_id: String,
        name: String,
        #[serde(default)]
        email: String,
    },
    /// A nested investing entity. Receives a single line item; its own
    /// owners are not expanded here.
    InvestingEntity { entity_id: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalLineItem {
    pub label: String,
    pub amount: Money,
}

/// Problems in the ownership records that do not by themselves block a
/// distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipWarning {
    /// Owners hold less than 100% of the entity investment
    PercentageShortfall {
        entity_investment_id: String,
        attributed_percentage: Percent,
    },
    /// Owners hold more than 100%; shares are scaled down pro rata
    PercentageExcess {
        entity_investment_id: String,
        attributed_percentage: Percent,
    },
    /// Owners' capital exceeds the entity investment amount
    CapitalExceeded {
        entity_investment_id: String,
        owners_capital: Money,
        investment_amount: Money,
    },
    /// An owner's breakdown does not sum to its investment amount
    BreakdownMismatch {
        owner_id: String,
        breakdown_total: Money,
        investment_amount: Money,
    },
}

impl std::fmt::Display for OwnershipWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnershipWarning::PercentageShortfall {
                entity_investment_id,
                attributed_percentage,
            } => write!(
                f,
                "Entity investment {entity_investment_id}: owners hold {attributed_percentage}%; the remainder is unattributed"
            ),
            OwnershipWarning::PercentageExcess {
                entity_investment_id,
                attributed_percentage,
            } => write!(
                f,
                "Entity investment {entity_investment_id}: owners hold {attributed_percentage}%, scaled down to 100%"
            ),
            OwnershipWarning::CapitalExceeded {
                entity_investment_id,
                owners_capital,
                investment_amount,
            } => write!(
                f,
                "Entity investment {entity_investment_id}: owners contributed {owners_capital}, above the investment amount {investment_amount}"
            ),
            OwnershipWarning::BreakdownMismatch {
                owner_id,
                breakdown_total,
                investment_amount,
            } => write!(
                f,
                "Owner {owner_id}: breakdown totals {breakdown_total} but investment amount is {investment_amount}"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Behaviour
// ---------------------------------------------------------------------------

impl Owner {
    /// Sum of the breakdown line items, when the owner carries one.
    pub fn breakdown_total(&self) -> Option<Money> {
        self.breakdown
            .as_ref()
            .map(|items| items.iter().map(|i| i.amount).sum())
    }

    pub fn display_name(&self) -> &str {
        match &self.holder {
            OwnerKind::Individual { name, .. } | OwnerKind::InvestingEntity { name, .. } => name,
        }
    }
}

impl EntityInvestment {
    pub fn owners_percentage(&self) -> Percent {
        self.owners.iter().map(|o| o.ownership_percentage).sum()
    }

    pub fn owners_capital(&self) -> Money {
        self.owners.iter().map(|o| o.investment_amount).sum()
    }
}

impl OwnershipGraph {
    /// Headline investment of every owner across all entity investments.
    /// Breakdown line items never enter distribution math.
    pub fn total_owner_capital(&self) -> Money {
        self.entity_investments
            .iter()
            .map(|ei| ei.owners_capital())
            .sum()
    }

    pub fn total_property_percentage(&self) -> Percent {
        self.entity_investments
            .iter()
            .map(|ei| ei.ownership_percentage)
            .sum()
    }

    /// Reject malformed records. Structural gaps that still allow a
    /// distribution are returned by [`OwnershipGraph::warnings`] instead.
    pub fn validate(&self) -> DistributionResult<()> {
        if self.entity_investments.is_empty() {
            return Err(DistributionError::invalid(
                "entity_investments",
                format!("No entity investments found for property {}", self.property_id),
            ));
        }
        for ei in &self.entity_investments {
            if ei.ownership_percentage < Decimal::ZERO {
                return Err(DistributionError::invalid(
                    "entity_investments.ownership_percentage",
                    format!("Entity investment {} has a negative ownership percentage", ei.id),
                ));
            }
            if ei.investment_amount < Decimal::ZERO {
                return Err(DistributionError::invalid(
                    "entity_investments.investment_amount",
                    format!("Entity investment {} has a negative investment amount", ei.id),
                ));
            }
            for owner in &ei.owners {
                if owner.ownership_percentage < Decimal::ZERO {
                    return Err(DistributionError::invalid(
                        "owners.ownership_percentage",
                        format!("Owner {} has a negative ownership percentage", owner.id),
                    ));
                }
                if owner.investment_amount < Decimal::ZERO {
                    return Err(DistributionError::invalid(
                        "owners.investment_amount",
                        format!("Owner {} has a negative investment amount", owner.id),
                    ));
                }
            }
        }
        if self.total_property_percentage().is_zero() {
            return Err(DistributionError::invalid(
                "entity_investments.ownership_percentage",
                "Entity investments hold 0% of the property in total",
            ));
        }
        Ok(())
    }

    /// Every incomplete-ownership condition present in the graph, in
    /// record order.
    pub fn warnings(&self) -> Vec<OwnershipWarning> {
        let mut warnings = Vec::new();
        for ei in &self.entity_investments {
            let attributed = ei.owners_percentage();
            if attributed < Decimal::ONE_HUNDRED {
                warnings.push(OwnershipWarning::PercentageShortfall {
                    entity_investment_id: ei.id.clone(),
                    attributed_percentage: attributed,
                });
            } else if attributed > Decimal::ONE_HUNDRED {
                warnings.push(OwnershipWarning::PercentageExcess {
                    entity_investment_id: ei.id.clone(),
                    attributed_percentage: attributed,
                });
            }

            let capital = ei.owners_capital();
            if capital > ei.investment_amount {
                warnings.push(OwnershipWarning::CapitalExceeded {
                    entity_investment_id: ei.id.clone(),
                    owners_capital: capital,
                    investment_amount: ei.investment_amount,
                });
            }

            for owner in &ei.owners {
                if let Some(total) = owner.breakdown_total() {
                    if total != owner.investment_amount {
                        warnings.push(OwnershipWarning::BreakdownMismatch {
                            owner_id: owner.id.clone(),
                            breakdown_total: total,
                            investment_amount: owner.investment_amount,
                        });
                    }
                }
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn individual(id: &str, pct: Decimal, amount: Decimal) -> Owner {
        Owner {
            id: id.into(),
            holder: OwnerKind::Individual {
                user_id: format!("user-{id}"),
                name: format!("Investor {id}"),
                email: format!("{id}@example.com"),
            },
            ownership_percentage: pct,
            investment_amount: amount,
            breakdown: None,
        }
    }

    fn graph(owners: Vec<Owner>, amount: Decimal) -> OwnershipGraph {
        OwnershipGraph {
            property_id: "prop-1".into(),
            entity_investments: vec![EntityInvestment {
                id: "ei-1".into(),
                entity_id: "ent-1".into(),
                entity_name: "Campus Holdings LLC".into(),
                investment_amount: amount,
                ownership_percentage: dec!(100),
                investment_date: NaiveDate::from_ymd_opt(2022, 1, 15).unwrap(),
                status: InvestmentStatus::Active,
                owners,
            }],
        }
    }

    #[test]
    fn test_complete_graph_has_no_warnings() {
        let g = graph(
            vec![
                individual("a", dec!(60), dec!(60_000)),
                individual("b", dec!(40), dec!(40_000)),
            ],
            dec!(100_000),
        );
        assert!(g.validate().is_ok());
        assert!(g.warnings().is_empty());
        assert_eq!(g.total_owner_capital(), dec!(100_000));
    }

    #[test]
    fn test_shortfall_and_capital_exceeded() {
        let g = graph(
            vec![individual("a", dec!(70), dec!(120_000))],
            dec!(100_000),
        );
        let w = g.warnings();
        assert_eq!(w.len(), 2);
        assert_eq!(
            w[0],
            OwnershipWarning::PercentageShortfall {
                entity_investment_id: "ei-1".into(),
                attributed_percentage: dec!(70),
            }
        );
        assert!(matches!(w[1], OwnershipWarning::CapitalExceeded { .. }));
    }

    #[test]
    fn test_breakdown_mismatch_keeps_headline_capital() {
        let mut owner = individual("a", dec!(100), dec!(50_000));
        owner.breakdown = Some(vec![
            CapitalLineItem { label: "Initial".into(), amount: dec!(40_000) },
            CapitalLineItem { label: "Capital call".into(), amount: dec!(15_000) },
        ]);
        assert_eq!(owner.breakdown_total(), Some(dec!(55_000)));

        let g = graph(vec![owner], dec!(100_000));
        assert_eq!(g.total_owner_capital(), dec!(50_000));
        let w = g.warnings();
        assert_eq!(
            w,
            vec![OwnershipWarning::BreakdownMismatch {
                owner_id: "a".into(),
                breakdown_total: dec!(55_000),
                investment_amount: dec!(50_000),
            }]
        );
    }

    #[test]
    fn test_empty_graph_rejected() {
        let g = OwnershipGraph {
            property_id: "prop-1".into(),
            entity_investments: vec![],
        };
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_negative_owner_percentage_rejected() {
        let g = graph(vec![individual("a", dec!(-5), dec!(0))], dec!(100));
        match g.validate().unwrap_err() {
            DistributionError::InvalidInput { field, .. } => {
                assert_eq!(field, "owners.ownership_percentage")
            }
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }
    }

    #[test]
    fn test_owner_kind_json() {
        let json = r#"{"kind":"INVESTING_ENTITY","entity_id":"ent-7","name":"Family Trust"}"#;
        let kind: OwnerKind = serde_json::from_str(json).unwrap();
        assert_eq!(
            kind,
            OwnerKind::InvestingEntity {
                entity_id: "ent-7".into(),
                name: "Family Trust".into()
            }
        );
    }
}
