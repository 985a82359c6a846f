//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::adapter::TableNames;

/// Which backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    #[serde(alias = "click_house")]
    ClickHouse,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "clickhouse" | "click_house" => Ok(Self::ClickHouse),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Store section of the service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub tables: TableNames,
    pub clickhouse: ClickHouseConfig,
}

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
    /// Per-operation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_database() -> String {
    "clickstream".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            database: default_database(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}
