use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use realty_waterfall_core::waterfall::engine::{self, DistributionInput};
use realty_waterfall_core::waterfall::netting::{self, RefinanceInput};
use realty_waterfall_core::EngineConfig;

use crate::input;

/// Arguments for a ledger-free distribution run
#[derive(Args)]
pub struct ComputeArgs {
    /// Path to JSON scenario (structure, ownership, property_debt, amounts)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_compute(
    args: ComputeArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: DistributionInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for compute".into());
    };
    let result = engine::compute_distribution(&scenario, config)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for refinance netting
#[derive(Args)]
pub struct RefinanceArgs {
    /// Path to JSON refinance terms (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Principal of the new loan
    #[arg(long)]
    pub refinance_amount: Option<Decimal>,

    /// Balance of the loan being retired
    #[arg(long)]
    pub current_debt: Option<Decimal>,

    /// Origination fees
    #[arg(long)]
    pub origination_fees: Option<Decimal>,

    /// Prepayment penalty on the retired loan
    #[arg(long)]
    pub prepayment_penalty: Option<Decimal>,
}

pub fn run_refinance(args: RefinanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let refi_input: RefinanceInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        let amount = args
            .refinance_amount
            .ok_or("--refinance-amount is required (or provide --input)")?;
        RefinanceInput {
            terms: netting::RefinanceTerms {
                refinance_amount: amount,
                origination_fees: args.origination_fees.unwrap_or_default(),
                closing_fees_items: Vec::new(),
                prepayment_penalty: args.prepayment_penalty.unwrap_or_default(),
                lender: None,
                interest_rate: None,
                term_years: None,
            },
            current_debt: args.current_debt.unwrap_or_default(),
        }
    };

    let result = netting::net_refinance(&refi_input.terms, refi_input.current_debt)?;
    Ok(serde_json::json!({ "result": result }))
}
