#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::{
    FileStore, JsonRpcLedgerGateway, LedgerConnection, LocalStorage, MockLedgerGateway,
};
use crate::domain::model::VoteEvent;
use crate::domain::ports::LedgerGateway;
use crate::utils::error::{ReconcileError, Result};
use std::sync::Arc;
use std::time::Duration;
pub use toml_config::{LedgerConfig, LedgerMode, StoreConfig, SyncConfig};

impl LedgerConfig {
    /// Builds the gateway selected by `mode`.
    pub async fn build_gateway(&self) -> Result<Arc<dyn LedgerGateway>> {
        match self.mode {
            LedgerMode::Mock => {
                let gateway = match &self.mock_events {
                    Some(path) => {
                        let data = tokio::fs::read(path).await?;
                        let events: Vec<VoteEvent> = serde_json::from_slice(&data)?;
                        tracing::info!("Loaded {} mock vote events from {}", events.len(), path);
                        MockLedgerGateway::from_events(events)
                    }
                    None => MockLedgerGateway::new(),
                };
                tracing::warn!("⚠️  Using mock ledger (no node required)");
                Ok(Arc::new(gateway))
            }
            LedgerMode::Rpc => {
                let contract = self
                    .contract_address
                    .clone()
                    .ok_or_else(|| ReconcileError::MissingConfig {
                        field: "ledger.contract_address".to_string(),
                    })?;
                let connection = LedgerConnection::new(
                    &self.rpc_url,
                    Duration::from_secs(self.timeout_seconds),
                )?;
                if !connection.is_connected().await {
                    tracing::warn!(
                        "💡 Ledger node at {} is not reachable; sync will see no events",
                        self.rpc_url
                    );
                }
                Ok(Arc::new(JsonRpcLedgerGateway::new(
                    connection,
                    contract,
                    self.sender.clone(),
                )))
            }
        }
    }
}

impl StoreConfig {
    pub async fn open(&self) -> Result<FileStore<LocalStorage>> {
        FileStore::open(LocalStorage::new(&self.path), self.file_name.clone()).await
    }
}
