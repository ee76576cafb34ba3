use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::fanout::{fan_out, Fanout};
use super::netting::{net_debt, net_refinance, RefinanceTerms};
use super::ownership::OwnershipGraph;
use super::report::{build_report, DistributionReport, ReportAmounts};
use super::structure::WaterfallStructure;
use super::tiers::allocate_tiers;
use crate::config::EngineConfig;
use crate::error::DistributionError;
use crate::types::*;
use crate::DistributionResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Source of the cash being distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionType {
    RentalIncome,
    SaleProceeds,
    Refinance,
    InsuranceSettlement,
    ReturnOfCapital,
    PreferredReturn,
    Promote,
    Other,
}

/// Everything one allocation needs: the waterfall, a snapshot of the
/// property's ownership, its debt figure, and the cash event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionInput {
    pub structure: WaterfallStructure,
    pub ownership: OwnershipGraph,
    /// Property's outstanding debt at processing time
    #[serde(default)]
    pub property_debt: Money,
    pub distribution_type: DistributionType,
    /// Gross amount. Required for every type except REFINANCE, whose gross
    /// is the refinance amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinance: Option<RefinanceTerms>,
}

/// Result of running the pipeline, before anything is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub report: DistributionReport,
    /// Gross amount recorded on the distribution
    pub gross_amount: Money,
    /// Debt figure to write back to the property (REFINANCE only)
    pub new_debt_amount: Option<Money>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check that the amount fields match the distribution type. Returns the
/// gross amount of the event.
pub fn validate_amounts(
    distribution_type: DistributionType,
    total_amount: Option<Money>,
    refinance: Option<&RefinanceTerms>,
) -> DistributionResult<Money> {
    match (distribution_type, refinance) {
        (DistributionType::Refinance, Some(terms)) => {
            terms.validate()?;
            Ok(terms.refinance_amount)
        }
        (DistributionType::Refinance, None) => Err(DistributionError::invalid(
            "refinance",
            "Refinance terms (refinance_amount and fees) are required for REFINANCE distributions",
        )),
        (_, Some(_)) => Err(DistributionError::invalid(
            "refinance",
            "Refinance terms are only valid for REFINANCE distributions",
        )),
        (_, None) => {
            let total = total_amount.ok_or_else(|| {
                DistributionError::invalid("total_amount", "Total amount is required")
            })?;
            if total < Decimal::ZERO {
                return Err(DistributionError::invalid(
                    "total_amount",
                    "Total amount cannot be negative",
                ));
            }
            Ok(total)
        }
    }
}

/// The structure must be owned by the property whose ownership is being
/// distributed; global templates are never processed directly.
pub fn check_structure_scope(
    structure: &WaterfallStructure,
    property_id: &str,
) -> DistributionResult<()> {
    match structure.property_id.as_deref() {
        None => Err(DistributionError::GlobalStructureNotProcessable(
            structure.id.clone(),
        )),
        Some(owner) if owner != property_id => Err(DistributionError::PropertyMismatch {
            structure_id: structure.id.clone(),
            property_id: property_id.to_string(),
        }),
        Some(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// RefinanceNetting (REFINANCE only) → debt netting → tier allocation →
/// fan-out per tier → report.
///
/// Pure: reads nothing but its arguments and writes nothing. The caller is
/// responsible for persisting the outcome and the new debt figure together.
pub fn run_pipeline(
    input: &DistributionInput,
    config: &EngineConfig,
) -> DistributionResult<PipelineOutcome> {
    let dp = config.money_dp();
    let gross = validate_amounts(
        input.distribution_type,
        input.total_amount,
        input.refinance.as_ref(),
    )?;
    check_structure_scope(&input.structure, &input.ownership.property_id)?;
    input.structure.validate()?;
    input.ownership.validate()?;
    if input.property_debt < Decimal::ZERO {
        return Err(DistributionError::invalid(
            "property_debt",
            "Property debt cannot be negative",
        ));
    }

    let warnings = input.ownership.warnings();
    if config.block_on_incomplete_ownership && !warnings.is_empty() {
        let detail: Vec<String> = warnings.iter().map(|w| w.to_string()).collect();
        return Err(DistributionError::OwnershipIncomplete(detail.join("; ")));
    }

    let (amounts, new_debt_amount) = match &input.refinance {
        Some(terms) => {
            let refi = net_refinance(terms, input.property_debt)?;
            // The retired loan was paid out of the proceeds above, so the
            // debt stage sees nothing outstanding.
            let netted = net_debt(refi.net_distributable, Decimal::ZERO);
            let new_debt = refi.new_debt_amount;
            (
                ReportAmounts {
                    original_amount: refi.refinance_amount,
                    debt_subtracted: refi.old_debt_amount,
                    fees_subtracted: refi.total_fees(),
                    available_after_debt: netted.available_after_debt,
                    refinance: Some(refi),
                },
                Some(new_debt),
            )
        }
        None => {
            let netted = net_debt(gross, input.property_debt);
            (
                ReportAmounts {
                    original_amount: netted.original_amount,
                    debt_subtracted: netted.debt_subtracted,
                    fees_subtracted: Decimal::ZERO,
                    available_after_debt: netted.available_after_debt,
                    refinance: None,
                },
                None,
            )
        }
    };

    let available = amounts.available_after_debt;
    let capital_base = input.ownership.total_owner_capital();
    let allocations = allocate_tiers(available, &input.structure, capital_base, dp)?;

    let fanouts: Vec<Fanout> = allocations
        .iter()
        .map(|alloc| {
            debug!(
                tier = %alloc.tier_name,
                priority = alloc.priority,
                entitlement = %alloc.entitlement,
                absorbed = %alloc.absorbed,
                "tier allocated"
            );
            fan_out(alloc.absorbed, &input.ownership, dp)
        })
        .collect();

    let report = build_report(amounts, &allocations, &fanouts, warnings);

    Ok(PipelineOutcome {
        report,
        gross_amount: gross,
        new_debt_amount,
    })
}

/// Run the pipeline and wrap the report in the standard output envelope.
pub fn compute_distribution(
    input: &DistributionInput,
    config: &EngineConfig,
) -> DistributionResult<ComputationOutput<DistributionReport>> {
    let start = Instant::now();
    let outcome = run_pipeline(input, config)?;
    let warnings: Vec<String> = outcome
        .report
        .warnings
        .iter()
        .map(|w| w.to_string())
        .collect();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Real Estate Distribution Waterfall (priority tiers, two-level ownership fan-out)",
        &serde_json::json!({
            "structure_id": input.structure.id,
            "distribution_type": input.distribution_type,
            "gross_amount": outcome.gross_amount.to_string(),
            "property_debt": input.property_debt.to_string(),
            "num_tiers": outcome.report.by_tier.len(),
            "num_entity_investments": input.ownership.entity_investments.len(),
            "rounding": format!("banker's, {} dp", config.money_dp()),
        }),
        warnings,
        elapsed,
        outcome.report,
    ))
}
