use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::debug;

use realty_waterfall_core::ledger::service::{DetailsUpdate, DistributionService, ProcessRequest};
use realty_waterfall_core::ledger::store::{InMemoryStore, LedgerSnapshot};
use realty_waterfall_core::waterfall::engine::DistributionType;
use realty_waterfall_core::EngineConfig;

use crate::input;

type CliResult = Result<Value, Box<dyn std::error::Error>>;

fn open(path: &str, config: EngineConfig) -> Result<DistributionService<InMemoryStore>, Box<dyn std::error::Error>> {
    let snapshot: LedgerSnapshot = input::file::read_json(path)?;
    debug!(
        ledger = path,
        properties = snapshot.properties.len(),
        distributions = snapshot.distributions.len(),
        "ledger loaded"
    );
    Ok(DistributionService::new(
        InMemoryStore::from_snapshot(snapshot),
        config,
    ))
}

fn save(path: &str, service: &DistributionService<InMemoryStore>) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = service.store().snapshot()?;
    input::file::write_json(path, &snapshot)?;
    debug!(ledger = path, "ledger saved");
    Ok(())
}

/// Arguments for processing a distribution
#[derive(Args)]
pub struct ProcessArgs {
    /// Ledger snapshot file, rewritten on success
    #[arg(long)]
    pub ledger: String,

    /// Path to JSON process request
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_process(args: ProcessArgs, config: EngineConfig) -> CliResult {
    let request: ProcessRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for process".into());
    };

    let service = open(&args.ledger, config)?;
    let (distribution, report) = service.process_distribution(request)?;
    save(&args.ledger, &service)?;

    Ok(json!({
        "distribution": {
            "id": distribution.id,
            "property_id": distribution.property_id,
            "waterfall_structure_id": distribution.waterfall_structure_id,
            "distribution_date": distribution.distribution_date,
            "distribution_type": distribution.distribution_type,
            "total_amount": distribution.total_amount,
        },
        "result": report,
    }))
}

/// Arguments for retrieving a stored breakdown
#[derive(Args)]
pub struct BreakdownArgs {
    #[arg(long)]
    pub ledger: String,

    /// Distribution id
    #[arg(long)]
    pub id: String,
}

pub fn run_breakdown(args: BreakdownArgs, config: EngineConfig) -> CliResult {
    let service = open(&args.ledger, config)?;
    let report = service.get_distribution_breakdown(&args.id)?;
    Ok(json!({ "result": report }))
}

/// Arguments for listing a property's distributions
#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    pub ledger: String,

    /// Property id
    #[arg(long)]
    pub property: String,
}

pub fn run_list(args: ListArgs, config: EngineConfig) -> CliResult {
    let service = open(&args.ledger, config)?;
    let rows: Vec<Value> = service
        .list_distributions(&args.property)?
        .into_iter()
        .map(|d| {
            json!({
                "id": d.id,
                "distribution_date": d.distribution_date,
                "distribution_type": d.distribution_type,
                "total_amount": d.total_amount,
                "total_distributed": d.report.summary.total_distributed,
                "description": d.description,
            })
        })
        .collect();
    Ok(Value::Array(rows))
}

/// Arguments for editing descriptive fields
#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long)]
    pub ledger: String,

    /// Distribution id
    #[arg(long)]
    pub id: String,

    /// Recorded gross amount (the stored breakdown is not recomputed)
    #[arg(long)]
    pub total_amount: Option<Decimal>,

    /// Distribution date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Distribution type, e.g. RENTAL_INCOME
    #[arg(long)]
    pub distribution_type: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

pub fn run_update(args: UpdateArgs, config: EngineConfig) -> CliResult {
    let distribution_type: Option<DistributionType> = match args.distribution_type {
        Some(raw) => Some(
            serde_json::from_value(Value::String(raw.to_uppercase()))
                .map_err(|_| format!("Unknown distribution type '{raw}'"))?,
        ),
        None => None,
    };

    let service = open(&args.ledger, config)?;
    let updated = service.update_distribution_details(
        &args.id,
        DetailsUpdate {
            total_amount: args.total_amount,
            distribution_date: args.date,
            distribution_type,
            description: args.description,
        },
    )?;
    save(&args.ledger, &service)?;
    Ok(serde_json::to_value(updated)?)
}

/// Arguments for deleting a distribution
#[derive(Args)]
pub struct DeleteArgs {
    #[arg(long)]
    pub ledger: String,

    /// Distribution id
    #[arg(long)]
    pub id: String,
}

pub fn run_delete(args: DeleteArgs, config: EngineConfig) -> CliResult {
    let service = open(&args.ledger, config)?;
    service.delete_distribution(&args.id)?;
    save(&args.ledger, &service)?;
    Ok(json!({ "deleted": args.id }))
}

/// Arguments for copying a global structure to a property
#[derive(Args)]
pub struct CopyStructureArgs {
    #[arg(long)]
    pub ledger: String,

    /// Global structure id
    #[arg(long)]
    pub structure: String,

    /// Target property id
    #[arg(long)]
    pub property: String,
}

pub fn run_copy_structure(args: CopyStructureArgs, config: EngineConfig) -> CliResult {
    let service = open(&args.ledger, config)?;
    let structure = service.copy_global_structure(&args.structure, &args.property)?;
    save(&args.ledger, &service)?;
    Ok(serde_json::to_value(structure)?)
}
