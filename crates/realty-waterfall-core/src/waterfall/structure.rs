use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::DistributionError;
use crate::types::Percent;
use crate::DistributionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A negotiated distribution waterfall: an ordered set of priority tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallStructure {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owning property. `None` marks a global template that has to be copied
    /// to a property before any distribution can run against it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub tiers: Vec<Tier>,
}

/// One tier of a waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Display number
    pub tier_number: u32,
    pub tier_name: String,
    /// Processing order, ascending. Must be unique within a structure.
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Tier mechanics and the parameter that belongs to them
    #[serde(flatten)]
    pub kind: TierKind,
}

fn default_active() -> bool {
    true
}

/// Allocation mechanics of a tier. Each variant carries only its own
/// parameter, expressed as a percentage (8 = 8%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierKind {
    /// Flat return on contributed capital for this distribution event
    PreferredReturn { return_rate: Percent },
    /// Share of the preferred return paid so far in this distribution
    CatchUp { catch_up_percentage: Percent },
    /// Share of whatever remains when the tier is reached
    Promote { promote_percentage: Percent },
    /// Everything that remains
    Residual,
    /// Repayment of contributed capital
    ReturnOfCapital,
}

/// Plain tier type label, used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierType {
    PreferredReturn,
    CatchUp,
    Promote,
    Residual,
    ReturnOfCapital,
}

impl TierKind {
    pub fn tier_type(&self) -> TierType {
        match self {
            TierKind::PreferredReturn { .. } => TierType::PreferredReturn,
            TierKind::CatchUp { .. } => TierType::CatchUp,
            TierKind::Promote { .. } => TierType::Promote,
            TierKind::Residual => TierType::Residual,
            TierKind::ReturnOfCapital => TierType::ReturnOfCapital,
        }
    }
}

// ---------------------------------------------------------------------------
// Behaviour
// ---------------------------------------------------------------------------

impl WaterfallStructure {
    pub fn is_global(&self) -> bool {
        self.property_id.is_none()
    }

    /// Active tiers sorted by ascending priority.
    pub fn ordered_tiers(&self) -> Vec<&Tier> {
        let mut tiers: Vec<&Tier> = self.tiers.iter().filter(|t| t.is_active).collect();
        tiers.sort_by_key(|t| t.priority);
        tiers
    }

    /// Check the structure can drive an allocation.
    ///
    /// Active tiers need unique priorities and unique names (the report is
    /// keyed by tier name), and every percentage parameter must be
    /// non-negative; catch-up and promote shares are capped at 100%.
    pub fn validate(&self) -> DistributionResult<()> {
        let active: Vec<&Tier> = self.tiers.iter().filter(|t| t.is_active).collect();
        if active.is_empty() {
            return Err(DistributionError::invalid(
                "tiers",
                format!("Waterfall structure '{}' has no active tiers", self.name),
            ));
        }

        let mut priorities = HashSet::new();
        let mut names = HashSet::new();
        for tier in &active {
            if !priorities.insert(tier.priority) {
                return Err(DistributionError::invalid(
                    "tiers.priority",
                    format!("Duplicate tier priority {}", tier.priority),
                ));
            }
            if tier.tier_name.trim().is_empty() {
                return Err(DistributionError::invalid(
                    "tiers.tier_name",
                    "Tier name cannot be empty",
                ));
            }
            if !names.insert(tier.tier_name.as_str()) {
                return Err(DistributionError::invalid(
                    "tiers.tier_name",
                    format!("Duplicate tier name '{}'", tier.tier_name),
                ));
            }
            tier.kind.validate()?;
        }
        Ok(())
    }

    /// Copy a global template into a structure owned by `property_id`.
    pub fn localized(&self, new_id: String, property_id: &str, property_name: &str) -> Self {
        let description = if self.description.is_empty() {
            format!("Applied from global structure {}", self.id)
        } else {
            format!("Applied from global structure: {}", self.description)
        };
        WaterfallStructure {
            id: new_id,
            name: format!("{} - {}", self.name, property_name),
            description,
            property_id: Some(property_id.to_string()),
            tiers: self.tiers.iter().filter(|t| t.is_active).cloned().collect(),
        }
    }
}

impl TierKind {
    fn validate(&self) -> DistributionResult<()> {
        match *self {
            TierKind::PreferredReturn { return_rate } => {
                if return_rate < Decimal::ZERO {
                    return Err(DistributionError::invalid(
                        "return_rate",
                        "Preferred return rate cannot be negative",
                    ));
                }
            }
            TierKind::CatchUp { catch_up_percentage } => {
                check_share("catch_up_percentage", catch_up_percentage)?;
            }
            TierKind::Promote { promote_percentage } => {
                check_share("promote_percentage", promote_percentage)?;
            }
            TierKind::Residual | TierKind::ReturnOfCapital => {}
        }
        Ok(())
    }
}

fn check_share(field: &str, value: Percent) -> DistributionResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(DistributionError::invalid(
            field,
            "Percentage must be between 0 and 100",
        ));
    }
    Ok(())
}
