use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DistributionError;
use crate::types::{Money, Percent};
use crate::DistributionResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Financing terms of a refinance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinanceTerms {
    /// Principal of the new loan. Becomes the property's debt figure.
    pub refinance_amount: Money,
    #[serde(default)]
    pub origination_fees: Money,
    #[serde(default)]
    pub closing_fees_items: Vec<ClosingFeeItem>,
    #[serde(default)]
    pub prepayment_penalty: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lender: Option<String>,
    /// Annual interest rate of the new loan, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Percent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_years: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosingFeeItem {
    pub category: String,
    pub amount: Money,
}

/// Standalone refinance netting request: the terms plus the balance being
/// retired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinanceInput {
    #[serde(flatten)]
    pub terms: RefinanceTerms,
    #[serde(default)]
    pub current_debt: Money,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// How refinance proceeds were netted down to the distributable amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinanceNetting {
    pub refinance_amount: Money,
    /// Loan balance retired out of the proceeds
    pub old_debt_amount: Money,
    pub origination_fees: Money,
    pub closing_fees: Money,
    pub closing_fees_items: Vec<ClosingFeeItem>,
    pub prepayment_penalty: Money,
    pub net_distributable: Money,
    /// Debt figure the property carries once the refinance commits
    pub new_debt_amount: Money,
}

impl RefinanceNetting {
    /// Financing costs, excluding the retired loan.
    pub fn total_fees(&self) -> Money {
        self.origination_fees + self.closing_fees + self.prepayment_penalty
    }
}

/// Result of subtracting outstanding debt ahead of the equity tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebtNetting {
    pub original_amount: Money,
    pub debt_subtracted: Money,
    pub available_after_debt: Money,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

impl RefinanceTerms {
    /// Newly originated debt; always the refinance amount.
    pub fn new_debt_amount(&self) -> Money {
        self.refinance_amount
    }

    pub fn closing_fees_total(&self) -> Money {
        self.closing_fees_items.iter().map(|i| i.amount).sum()
    }

    pub fn validate(&self) -> DistributionResult<()> {
        let checks = [
            ("refinance_amount", self.refinance_amount),
            ("origination_fees", self.origination_fees),
            ("prepayment_penalty", self.prepayment_penalty),
        ];
        for (field, value) in checks {
            if value < Decimal::ZERO {
                return Err(DistributionError::invalid(field, "Amount cannot be negative"));
            }
        }
        for item in &self.closing_fees_items {
            if item.amount < Decimal::ZERO {
                return Err(DistributionError::invalid(
                    "closing_fees_items",
                    format!("Closing fee '{}' cannot be negative", item.category),
                ));
            }
        }
        Ok(())
    }

    /// Describe the new loan for the property's debt details text.
    pub fn debt_details(&self) -> String {
        let lender = self.lender.as_deref().unwrap_or("New lender");
        let rate = self
            .interest_rate
            .map(|r| format!("{r}%"))
            .unwrap_or_else(|| "Rate TBD".to_string());
        let term = self
            .term_years
            .map(|t| format!("{t} year term"))
            .unwrap_or_else(|| "Term TBD".to_string());
        format!("Refinanced debt - {lender} - {rate} - {term}")
    }
}

/// Net refinance proceeds against the loan being retired and the cost of
/// the new financing.
///
/// `net = refinance − current debt − origination − Σ closing fees − prepayment`.
/// A negative result fails with `InsufficientRefinanceProceeds`; the caller
/// must then leave the property's debt untouched.
pub fn net_refinance(
    terms: &RefinanceTerms,
    current_debt: Money,
) -> DistributionResult<RefinanceNetting> {
    terms.validate()?;
    if current_debt < Decimal::ZERO {
        return Err(DistributionError::invalid(
            "current_debt",
            "Property debt cannot be negative",
        ));
    }

    let closing_fees = terms.closing_fees_total();
    let net_distributable = terms.refinance_amount
        - current_debt
        - terms.origination_fees
        - closing_fees
        - terms.prepayment_penalty;

    if net_distributable < Decimal::ZERO {
        return Err(DistributionError::InsufficientRefinanceProceeds { net_distributable });
    }

    Ok(RefinanceNetting {
        refinance_amount: terms.refinance_amount,
        old_debt_amount: current_debt,
        origination_fees: terms.origination_fees,
        closing_fees,
        closing_fees_items: terms.closing_fees_items.clone(),
        prepayment_penalty: terms.prepayment_penalty,
        net_distributable,
        new_debt_amount: terms.new_debt_amount(),
    })
}

/// Subtract outstanding debt from the amount heading into the tiers.
///
/// Debt service ranks ahead of equity, so the subtraction is clamped to the
/// amount on hand; any unpaid balance stays on the property record.
pub fn net_debt(original_amount: Money, debt_amount: Money) -> DebtNetting {
    let debt_subtracted = debt_amount.max(Decimal::ZERO).min(original_amount.max(Decimal::ZERO));
    DebtNetting {
        original_amount,
        debt_subtracted,
        available_after_debt: original_amount - debt_subtracted,
    }
}
