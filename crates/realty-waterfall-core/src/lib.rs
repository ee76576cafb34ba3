pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "waterfall")]
pub mod waterfall;

#[cfg(feature = "ledger")]
pub mod ledger;

pub use config::EngineConfig;
pub use error::DistributionError;
pub use types::*;

/// Standard result type for all distribution operations
pub type DistributionResult<T> = Result<T, DistributionError>;
