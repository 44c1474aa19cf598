pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{Cli, Command, OutputFormat};

pub use adapters::{
    FileStore, InMemoryStore, JsonRpcLedgerGateway, LedgerConnection, LocalStorage,
    MockLedgerGateway,
};
pub use config::SyncConfig;
pub use crate::core::reconciler::Reconciler;
pub use utils::error::{ReconcileError, Result};
