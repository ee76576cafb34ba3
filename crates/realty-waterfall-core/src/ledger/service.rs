use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::store::{DebtUpdate, Distribution, LedgerStore};
use crate::config::EngineConfig;
use crate::error::DistributionError;
use crate::types::Money;
use crate::waterfall::engine::{run_pipeline, validate_amounts, DistributionInput, DistributionType};
use crate::waterfall::netting::RefinanceTerms;
use crate::waterfall::report::DistributionReport;
use crate::waterfall::structure::WaterfallStructure;
use crate::DistributionResult;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request to process one distribution against a property's waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub structure_id: String,
    /// Property the caller expects the structure to belong to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    /// Gross amount; omitted for REFINANCE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Money>,
    pub distribution_date: NaiveDate,
    pub distribution_type: DistributionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinance: Option<RefinanceTerms>,
}

/// Edits to a distribution's descriptive fields. The stored breakdown is
/// never recomputed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailsUpdate {
    pub total_amount: Option<Money>,
    pub distribution_date: Option<NaiveDate>,
    pub distribution_type: Option<DistributionType>,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Runs the distribution pipeline against a [`LedgerStore`].
///
/// At most one distribution per property is in flight: the property's lock
/// is taken before its debt figure is read and held until the distribution
/// and any new debt figure are committed.
pub struct DistributionService<S: LedgerStore> {
    store: S,
    config: EngineConfig,
    property_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: LedgerStore> DistributionService<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            property_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn property_lock(&self, property_id: &str) -> DistributionResult<Arc<Mutex<()>>> {
        let mut locks = self
            .property_locks
            .lock()
            .map_err(|_| DistributionError::Storage("property lock registry poisoned".into()))?;
        Ok(locks
            .entry(property_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Allocate a distribution and persist it.
    ///
    /// Nothing is written unless every stage succeeds. For REFINANCE the
    /// property's debt figure is replaced by the refinance amount in the same
    /// commit as the distribution record.
    pub fn process_distribution(
        &self,
        request: ProcessRequest,
    ) -> DistributionResult<(Distribution, DistributionReport)> {
        validate_amounts(
            request.distribution_type,
            request.total_amount,
            request.refinance.as_ref(),
        )?;

        let structure = self
            .store
            .structure(&request.structure_id)?
            .ok_or_else(|| DistributionError::StructureNotFound(request.structure_id.clone()))?;
        let property_id = structure
            .property_id
            .clone()
            .ok_or_else(|| DistributionError::GlobalStructureNotProcessable(structure.id.clone()))?;
        if let Some(expected) = &request.property_id {
            if expected != &property_id {
                return Err(DistributionError::PropertyMismatch {
                    structure_id: structure.id.clone(),
                    property_id: expected.clone(),
                });
            }
        }

        let lock = self.property_lock(&property_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| DistributionError::Storage(format!("lock for property {property_id} poisoned")))?;

        let property = self
            .store
            .property(&property_id)?
            .ok_or_else(|| DistributionError::PropertyNotFound(property_id.clone()))?;
        let ownership = self.store.ownership_graph(&property_id)?;

        let input = DistributionInput {
            structure,
            ownership,
            property_debt: property.debt_amount,
            distribution_type: request.distribution_type,
            total_amount: request.total_amount,
            refinance: request.refinance.clone(),
        };
        let outcome = match run_pipeline(&input, &self.config) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(property = %property_id, structure = %input.structure.id, error = %e, "distribution rejected");
                return Err(e);
            }
        };

        for w in &outcome.report.warnings {
            warn!(property = %property_id, warning = %w, "ownership incomplete");
        }
        let left = outcome.report.summary.undistributed_amount;
        if !left.is_zero() {
            warn!(property = %property_id, structure = %input.structure.id, undistributed = %left, "no tier absorbed the remaining pool");
        }

        let debt_update = outcome.new_debt_amount.map(|debt_amount| DebtUpdate {
            property_id: property_id.clone(),
            debt_amount,
            debt_details: request.refinance.as_ref().map(|t| t.debt_details()),
        });

        let distribution = Distribution {
            id: self.store.next_id("dist")?,
            property_id: property_id.clone(),
            waterfall_structure_id: input.structure.id.clone(),
            total_amount: outcome.gross_amount,
            distribution_date: request.distribution_date,
            distribution_type: request.distribution_type,
            description: request.description,
            refinance: request.refinance,
            old_debt_amount: Some(property.debt_amount),
            report: outcome.report.clone(),
        };

        self.store
            .commit_distribution(distribution.clone(), debt_update)?;

        info!(
            distribution = %distribution.id,
            property = %property_id,
            kind = ?distribution.distribution_type,
            available = %outcome.report.summary.available_after_debt,
            tiers = outcome.report.summary.tiers_processed,
            "distribution processed"
        );
        if let Some(debt) = outcome.new_debt_amount {
            info!(property = %property_id, old = %property.debt_amount, new = %debt, "property debt refinanced");
        }

        Ok((distribution, outcome.report))
    }

    /// The breakdown stored when the distribution was processed.
    pub fn get_distribution_breakdown(
        &self,
        distribution_id: &str,
    ) -> DistributionResult<DistributionReport> {
        self.store
            .distribution(distribution_id)?
            .map(|d| d.report)
            .ok_or_else(|| DistributionError::DistributionNotFound(distribution_id.to_string()))
    }

    /// Distributions of a property, newest first.
    pub fn list_distributions(&self, property_id: &str) -> DistributionResult<Vec<Distribution>> {
        let mut distributions = self.store.distributions_for_property(property_id)?;
        distributions.sort_by(|a, b| {
            b.distribution_date
                .cmp(&a.distribution_date)
                .then_with(|| id_sequence(&b.id).cmp(&id_sequence(&a.id)))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(distributions)
    }

    /// Edit descriptive fields. The stored allocation stays as processed.
    pub fn update_distribution_details(
        &self,
        distribution_id: &str,
        update: DetailsUpdate,
    ) -> DistributionResult<Distribution> {
        let mut distribution = self
            .store
            .distribution(distribution_id)?
            .ok_or_else(|| DistributionError::DistributionNotFound(distribution_id.to_string()))?;

        if let Some(total) = update.total_amount {
            if total < Decimal::ZERO {
                return Err(DistributionError::invalid(
                    "total_amount",
                    "Total amount cannot be negative",
                ));
            }
            distribution.total_amount = total;
        }
        if let Some(date) = update.distribution_date {
            distribution.distribution_date = date;
        }
        if let Some(kind) = update.distribution_type {
            distribution.distribution_type = kind;
        }
        if let Some(description) = update.description {
            distribution.description = Some(description);
        }

        self.store.update_distribution(distribution.clone())?;
        info!(distribution = %distribution_id, "distribution details updated");
        Ok(distribution)
    }

    /// Hard delete. Debt changes made by a refinance are not reversed.
    pub fn delete_distribution(&self, distribution_id: &str) -> DistributionResult<()> {
        let distribution = self
            .store
            .distribution(distribution_id)?
            .ok_or_else(|| DistributionError::DistributionNotFound(distribution_id.to_string()))?;

        let lock = self.property_lock(&distribution.property_id)?;
        let _guard = lock.lock().map_err(|_| {
            DistributionError::Storage(format!(
                "lock for property {} poisoned",
                distribution.property_id
            ))
        })?;

        if !self.store.delete_distribution(distribution_id)? {
            return Err(DistributionError::DistributionNotFound(
                distribution_id.to_string(),
            ));
        }
        info!(distribution = %distribution_id, property = %distribution.property_id, "distribution deleted");
        Ok(())
    }

    /// Copy a global template into a new structure owned by `property_id`.
    pub fn copy_global_structure(
        &self,
        structure_id: &str,
        property_id: &str,
    ) -> DistributionResult<WaterfallStructure> {
        let template = self
            .store
            .structure(structure_id)?
            .ok_or_else(|| DistributionError::StructureNotFound(structure_id.to_string()))?;
        if !template.is_global() {
            return Err(DistributionError::invalid(
                "structure_id",
                format!("Waterfall structure {structure_id} already belongs to a property"),
            ));
        }
        template.validate()?;

        let property = self
            .store
            .property(property_id)?
            .ok_or_else(|| DistributionError::PropertyNotFound(property_id.to_string()))?;

        let local = template.localized(self.store.next_id("ws")?, &property.id, &property.name);
        self.store.insert_structure(local.clone())?;
        info!(template = %structure_id, structure = %local.id, property = %property_id, "global structure copied");
        Ok(local)
    }
}

/// Numeric suffix of a store-issued id (`dist-10` -> 10).
fn id_sequence(id: &str) -> Option<u64> {
    id.rsplit('-').next().and_then(|n| n.parse().ok())
}
