use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient refinance proceeds: net distributable would be {net_distributable}")]
    InsufficientRefinanceProceeds { net_distributable: Decimal },

    #[error("Ownership incomplete: {0}")]
    OwnershipIncomplete(String),

    #[error("Waterfall structure not found: {0}")]
    StructureNotFound(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Distribution not found: {0}")]
    DistributionNotFound(String),

    #[error("Waterfall structure {structure_id} does not belong to property {property_id}")]
    PropertyMismatch {
        structure_id: String,
        property_id: String,
    },

    #[error("Waterfall structure {0} is a global template; copy it to a property before processing")]
    GlobalStructureNotProcessable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DistributionError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DistributionError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DistributionError {
    fn from(e: serde_json::Error) -> Self {
        DistributionError::SerializationError(e.to_string())
    }
}
