use serde::{Deserialize, Serialize};

use crate::types::Currency;

/// Engine-wide settings shared by the pipeline and the ledger service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency all amounts are denominated in
    pub currency: Currency,
    /// Decimal places of the smallest currency unit. Defaults to the
    /// currency's own minor unit when omitted.
    pub minor_unit_decimals: Option<u32>,
    /// Reject distributions whose ownership records are incomplete instead
    /// of reporting the unattributed remainder as a warning.
    pub block_on_incomplete_ownership: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            minor_unit_decimals: None,
            block_on_incomplete_ownership: false,
        }
    }
}

impl EngineConfig {
    /// Rounding precision used for every monetary split.
    pub fn money_dp(&self) -> u32 {
        self.minor_unit_decimals
            .unwrap_or_else(|| self.currency.minor_unit_decimals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.money_dp(), 2);
        assert!(!cfg.block_on_incomplete_ownership);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"currency":"JPY"}"#).unwrap();
        assert_eq!(cfg.money_dp(), 0);

        let cfg: EngineConfig =
            serde_json::from_str(r#"{"minor_unit_decimals":4}"#).unwrap();
        assert_eq!(cfg.money_dp(), 4);
    }
}
