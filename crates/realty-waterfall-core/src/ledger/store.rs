use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::DistributionError;
use crate::types::Money;
use crate::waterfall::engine::DistributionType;
use crate::waterfall::netting::RefinanceTerms;
use crate::waterfall::ownership::OwnershipGraph;
use crate::waterfall::report::DistributionReport;
use crate::waterfall::structure::WaterfallStructure;
use crate::DistributionResult;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The slice of a property record the distribution pipeline touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub name: String,
    /// Outstanding secured debt
    #[serde(default)]
    pub debt_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_details: Option<String>,
}

/// A processed distribution. The report is fixed at processing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: String,
    pub property_id: String,
    pub waterfall_structure_id: String,
    /// Gross, pre-netting amount
    pub total_amount: Money,
    pub distribution_date: NaiveDate,
    pub distribution_type: DistributionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinance: Option<RefinanceTerms>,
    /// Property debt read when the distribution was processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_debt_amount: Option<Money>,
    pub report: DistributionReport,
}

/// New debt figure written together with a refinance distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtUpdate {
    pub property_id: String,
    pub debt_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_details: Option<String>,
}

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

/// Boundary to the services owning properties, ownership records, waterfall
/// structures and distributions.
///
/// `commit_distribution` must apply the distribution insert and the debt
/// update atomically: either both are visible afterwards or neither is.
pub trait LedgerStore: Send + Sync {
    fn property(&self, property_id: &str) -> DistributionResult<Option<PropertyRecord>>;

    fn structure(&self, structure_id: &str) -> DistributionResult<Option<WaterfallStructure>>;

    fn insert_structure(&self, structure: WaterfallStructure) -> DistributionResult<()>;

    /// Consistent snapshot of the property's entity investments and owners.
    fn ownership_graph(&self, property_id: &str) -> DistributionResult<OwnershipGraph>;

    fn commit_distribution(
        &self,
        distribution: Distribution,
        debt: Option<DebtUpdate>,
    ) -> DistributionResult<()>;

    fn distribution(&self, distribution_id: &str) -> DistributionResult<Option<Distribution>>;

    fn distributions_for_property(&self, property_id: &str) -> DistributionResult<Vec<Distribution>>;

    /// Replace a stored distribution. Fails with `DistributionNotFound` if it
    /// does not exist.
    fn update_distribution(&self, distribution: Distribution) -> DistributionResult<()>;

    /// Hard delete. Returns whether a record was removed.
    fn delete_distribution(&self, distribution_id: &str) -> DistributionResult<bool>;

    /// Allocate a fresh record id with the given prefix.
    fn next_id(&self, prefix: &str) -> DistributionResult<String>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Serializable contents of an [`InMemoryStore`]. Ordered maps keep the JSON
/// output stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSnapshot {
    pub properties: BTreeMap<String, PropertyRecord>,
    pub structures: BTreeMap<String, WaterfallStructure>,
    /// Ownership graphs keyed by property id
    pub ownership: BTreeMap<String, OwnershipGraph>,
    pub distributions: BTreeMap<String, Distribution>,
    pub next_id: u64,
}

/// Single-lock in-memory store. Every method runs under one mutex, which
/// makes `commit_distribution` atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<LedgerSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> DistributionResult<LedgerSnapshot> {
        Ok(self.lock()?.clone())
    }

    pub fn insert_property(&self, property: PropertyRecord) -> DistributionResult<()> {
        self.lock()?.properties.insert(property.id.clone(), property);
        Ok(())
    }

    pub fn insert_ownership(&self, graph: OwnershipGraph) -> DistributionResult<()> {
        self.lock()?.ownership.insert(graph.property_id.clone(), graph);
        Ok(())
    }

    fn lock(&self) -> DistributionResult<MutexGuard<'_, LedgerSnapshot>> {
        self.state
            .lock()
            .map_err(|_| DistributionError::Storage("ledger state lock poisoned".into()))
    }
}

impl LedgerStore for InMemoryStore {
    fn property(&self, property_id: &str) -> DistributionResult<Option<PropertyRecord>> {
        Ok(self.lock()?.properties.get(property_id).cloned())
    }

    fn structure(&self, structure_id: &str) -> DistributionResult<Option<WaterfallStructure>> {
        Ok(self.lock()?.structures.get(structure_id).cloned())
    }

    fn insert_structure(&self, structure: WaterfallStructure) -> DistributionResult<()> {
        self.lock()?
            .structures
            .insert(structure.id.clone(), structure);
        Ok(())
    }

    fn ownership_graph(&self, property_id: &str) -> DistributionResult<OwnershipGraph> {
        let state = self.lock()?;
        Ok(state
            .ownership
            .get(property_id)
            .cloned()
            .unwrap_or_else(|| OwnershipGraph {
                property_id: property_id.to_string(),
                entity_investments: Vec::new(),
            }))
    }

    fn commit_distribution(
        &self,
        distribution: Distribution,
        debt: Option<DebtUpdate>,
    ) -> DistributionResult<()> {
        let mut state = self.lock()?;

        // Check everything before the first write.
        if state.distributions.contains_key(&distribution.id) {
            return Err(DistributionError::Storage(format!(
                "distribution {} already exists",
                distribution.id
            )));
        }
        if let Some(update) = &debt {
            if !state.properties.contains_key(&update.property_id) {
                return Err(DistributionError::PropertyNotFound(update.property_id.clone()));
            }
        }

        if let Some(update) = debt {
            if let Some(property) = state.properties.get_mut(&update.property_id) {
                property.debt_amount = update.debt_amount;
                if update.debt_details.is_some() {
                    property.debt_details = update.debt_details;
                }
            }
        }
        state
            .distributions
            .insert(distribution.id.clone(), distribution);
        Ok(())
    }

    fn distribution(&self, distribution_id: &str) -> DistributionResult<Option<Distribution>> {
        Ok(self.lock()?.distributions.get(distribution_id).cloned())
    }

    fn distributions_for_property(&self, property_id: &str) -> DistributionResult<Vec<Distribution>> {
        Ok(self
            .lock()?
            .distributions
            .values()
            .filter(|d| d.property_id == property_id)
            .cloned()
            .collect())
    }

    fn update_distribution(&self, distribution: Distribution) -> DistributionResult<()> {
        let mut state = self.lock()?;
        match state.distributions.get_mut(&distribution.id) {
            Some(existing) => {
                *existing = distribution;
                Ok(())
            }
            None => Err(DistributionError::DistributionNotFound(distribution.id)),
        }
    }

    fn delete_distribution(&self, distribution_id: &str) -> DistributionResult<bool> {
        Ok(self.lock()?.distributions.remove(distribution_id).is_some())
    }

    fn next_id(&self, prefix: &str) -> DistributionResult<String> {
        let mut state = self.lock()?;
        state.next_id += 1;
        Ok(format!("{prefix}-{}", state.next_id))
    }
}
