use crate::utils::error::{ReconcileError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    Rpc,
    #[default]
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub mode: LedgerMode,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    pub contract_address: Option<String>,
    pub sender: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// JSON fixture of vote events for the mock ledger.
    pub mock_events: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    #[serde(default)]
    pub json: bool,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_store_path() -> String {
    "./data".to_string()
}

fn default_file_name() -> String {
    "ledger.json".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: LedgerMode::default(),
            rpc_url: default_rpc_url(),
            contract_address: None,
            sender: None,
            timeout_seconds: default_timeout_seconds(),
            mock_events: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            file_name: default_file_name(),
        }
    }
}

impl SyncConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReconcileError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LEDGER_SENDER})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReconcileError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("store.path", &self.store.path)?;
        validation::validate_non_empty_string("store.file_name", &self.store.file_name)?;
        validation::validate_range("ledger.timeout_seconds", self.ledger.timeout_seconds, 1, 600)?;

        if let Some(events) = &self.ledger.mock_events {
            validation::validate_file_extension("ledger.mock_events", events, &["json"])?;
        }

        if self.ledger.mode == LedgerMode::Rpc {
            validation::validate_url("ledger.rpc_url", &self.ledger.rpc_url)?;
            let contract =
                validation::validate_required_field(
                    "ledger.contract_address",
                    &self.ledger.contract_address,
                )?;
            validation::validate_address("ledger.contract_address", contract)?;
            if let Some(sender) = &self.ledger.sender {
                validation::validate_address("ledger.sender", sender)?;
            }
        }

        Ok(())
    }
}
