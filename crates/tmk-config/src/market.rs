//! Typed view over the merged config document.
//!
//! Policy names and prices stay as strings here; the crates that own those
//! types parse them.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub ledger: LedgerSection,
    #[serde(default)]
    pub prices: PricesSection,
    #[serde(default)]
    pub store: Option<StoreSection>,
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSection {
    #[serde(default = "default_oversell")]
    pub oversell_policy: String,
    #[serde(default = "default_coercion")]
    pub coercion_policy: String,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            oversell_policy: default_oversell(),
            coercion_policy: default_coercion(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricesSection {
    #[serde(default = "default_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_capacity")]
    pub cache_capacity: usize,
}

impl Default for PricesSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_ttl(),
            cache_capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSection {
    pub base_url: String,
    #[serde(default)]
    pub keys_env: StoreKeysEnv,
}

/// Env var NAMES for store credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreKeysEnv {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

/// One tradable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Store table holding the asset's price history.
    #[serde(default)]
    pub table: Option<String>,
    /// Decimal string, used when the oracle cannot answer.
    #[serde(default)]
    pub fallback_price: Option<String>,
    #[serde(default = "default_oracle")]
    pub oracle: String,
}

fn default_oversell() -> String {
    "clip".to_string()
}
fn default_coercion() -> String {
    "lenient".to_string()
}
fn default_ttl() -> u64 {
    30
}
fn default_capacity() -> usize {
    256
}
fn default_addr() -> String {
    "127.0.0.1:8899".to_string()
}
fn default_oracle() -> String {
    "rest".to_string()
}

impl MarketConfig {
    /// Deserialize from the merged config JSON and check shape constraints
    /// serde cannot express.
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: MarketConfig = serde_json::from_value(config_json.clone())
            .context("CONFIG_INVALID: market config does not match expected shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.prices.cache_capacity == 0 {
            bail!("CONFIG_INVALID: /prices/cache_capacity must be > 0");
        }
        for (i, a) in self.assets.iter().enumerate() {
            if a.id.trim().is_empty() {
                bail!("CONFIG_INVALID: /assets/{i}/id must not be empty");
            }
            if a.oracle == "rest" && a.table.is_none() {
                bail!(
                    "CONFIG_INVALID: /assets/{i} ('{}') uses the rest oracle but has no table",
                    a.id
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = MarketConfig::from_json(&serde_json::json!({})).unwrap();
        assert_eq!(cfg.ledger.oversell_policy, "clip");
        assert_eq!(cfg.ledger.coercion_policy, "lenient");
        assert_eq!(cfg.prices.cache_ttl_secs, 30);
        assert_eq!(cfg.daemon.addr, "127.0.0.1:8899");
        assert!(cfg.store.is_none());
        assert!(cfg.assets.is_empty());
    }

    #[test]
    fn rest_asset_requires_table() {
        let v = serde_json::json!({"assets": [{"id": "x"}]});
        let err = MarketConfig::from_json(&v).unwrap_err().to_string();
        assert!(err.contains("no table"), "{err}");
    }

    #[test]
    fn zero_capacity_rejected() {
        let v = serde_json::json!({"prices": {"cache_capacity": 0}});
        assert!(MarketConfig::from_json(&v).is_err());
    }
}
