//! Price oracle boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tmk_ledger::Micros;

use crate::error::SourceError;
use crate::registry::AssetSpec;

/// Latest known price for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub asset_id: String,
    pub price: Micros,
    /// When the upstream recorded the price, if it says.
    pub observed_at: Option<DateTime<Utc>>,
}

/// Source of current prices.
///
/// Object-safe so the pricing service can hold `Arc<dyn PriceOracle>` per
/// oracle name.
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    fn name(&self) -> &'static str;

    async fn latest_price(&self, asset: &AssetSpec) -> Result<PriceQuote, SourceError>;
}

/// In-memory prices. Used for `static` assets and `--mark` overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceOracle {
    prices: BTreeMap<String, Micros>,
}

impl StaticPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, asset_id: &str, price: Micros) -> Self {
        self.set(asset_id, price);
        self
    }

    pub fn set(&mut self, asset_id: &str, price: Micros) {
        self.prices.insert(asset_id.to_string(), price);
    }
}

#[async_trait::async_trait]
impl PriceOracle for StaticPriceOracle {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn latest_price(&self, asset: &AssetSpec) -> Result<PriceQuote, SourceError> {
        let price = self
            .prices
            .get(&asset.asset_id)
            .copied()
            .ok_or_else(|| SourceError::NotFound(asset.asset_id.clone()))?;
        Ok(PriceQuote {
            asset_id: asset.asset_id.clone(),
            price,
            observed_at: None,
        })
    }
}
