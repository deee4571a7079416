pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LambdaConfig, LedgerConfig};

pub use adapters::memory::InMemoryListStore;
pub use adapters::sharepoint::SharePointClient;
pub use crate::core::{
    ledger::MovementLedger, lookup::ProductDirectory, relay::ProductRelay,
    writer::MovementWriter,
};
pub use utils::error::{LedgerError, Result};
