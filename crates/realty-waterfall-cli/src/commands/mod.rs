pub mod distribution;
pub mod ledger;
