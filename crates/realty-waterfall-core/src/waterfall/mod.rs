pub mod engine;
pub mod fanout;
pub mod netting;
pub mod ownership;
pub mod report;
pub mod structure;
pub mod tiers;
