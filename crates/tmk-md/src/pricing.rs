//! Price resolution: cache, then the asset's oracle, then the configured
//! fallback price.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tmk_config::MarketConfig;
use tmk_ledger::Micros;
use tracing::{debug, info, warn};

use crate::cache::PriceCache;
use crate::error::SourceError;
use crate::oracle::{PriceOracle, StaticPriceOracle};
use crate::registry::{AssetRegistry, RegistryError};
use crate::rest::{RestPriceOracle, StoreClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Cache,
    Oracle,
    Fallback,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Cache => "cache",
            PriceSource::Oracle => "oracle",
            PriceSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedQuote {
    pub asset_id: String,
    pub price: Micros,
    pub source: PriceSource,
    /// Price before the last change, for showing direction.
    pub previous: Option<Micros>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    Registry(RegistryError),
    /// Oracle failed and the asset has no fallback price.
    Unavailable { asset_id: String, reason: String },
}

impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingError::Registry(e) => write!(f, "{e}"),
            PricingError::Unavailable { asset_id, reason } => {
                write!(f, "no price for '{asset_id}': {reason}")
            }
        }
    }
}

impl std::error::Error for PricingError {}

impl From<RegistryError> for PricingError {
    fn from(e: RegistryError) -> Self {
        PricingError::Registry(e)
    }
}

pub struct PricingService {
    registry: AssetRegistry,
    oracles: HashMap<String, Arc<dyn PriceOracle>>,
    // Never held across an await.
    cache: Mutex<PriceCache>,
}

impl PricingService {
    pub fn new(registry: AssetRegistry, cache: PriceCache) -> Self {
        Self {
            registry,
            oracles: HashMap::new(),
            cache: Mutex::new(cache),
        }
    }

    /// Compose registry, cache and oracles from config.
    ///
    /// `static` assets are priced at their configured fallback price. The
    /// `rest` oracle is only registered when a store is configured and a key
    /// was resolved; without it, `rest` assets fall back.
    pub fn from_config(
        cfg: &MarketConfig,
        store_api_key: Option<&str>,
    ) -> Result<Self, RegistryError> {
        let registry = AssetRegistry::from_config(&cfg.assets)?;

        let mut statics = StaticPriceOracle::new();
        for a in &cfg.assets {
            if a.oracle == "static" {
                if let Some(price) = registry.get(&a.id)?.fallback_price {
                    statics.set(&a.id, price);
                }
            }
        }

        let cache = PriceCache::new(
            Duration::from_secs(cfg.prices.cache_ttl_secs),
            cfg.prices.cache_capacity,
        );
        let mut svc = Self::new(registry, cache).with_oracle(Arc::new(statics));

        match (&cfg.store, store_api_key) {
            (Some(store), Some(key)) => {
                info!(base_url = %store.base_url, "rest price oracle enabled");
                let client = StoreClient::new(store.base_url.clone(), key.to_string());
                svc = svc.with_oracle(Arc::new(RestPriceOracle::new(client)));
            }
            (Some(_), None) => warn!("store configured without api key; rest assets use fallback prices"),
            (None, _) => {}
        }
        Ok(svc)
    }

    /// Register `oracle` under its own name.
    pub fn with_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.oracles.insert(oracle.name().to_string(), oracle);
        self
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub async fn price(&self, asset_id: &str) -> Result<PricedQuote, PricingError> {
        let spec = self.registry.get(asset_id)?;

        let cached = self.lock_cache().get(asset_id, Instant::now());
        if let Some(hit) = cached {
            debug!(asset_id, price = %hit.price, "price cache hit");
            return Ok(PricedQuote {
                asset_id: asset_id.to_string(),
                price: hit.price,
                source: PriceSource::Cache,
                previous: hit.previous,
            });
        }

        let fetched = match self.oracles.get(&spec.oracle) {
            Some(oracle) => oracle.latest_price(spec).await,
            None => Err(SourceError::NotFound(format!("oracle '{}'", spec.oracle))),
        };

        match fetched {
            Ok(quote) => {
                let mut cache = self.lock_cache();
                cache.insert(asset_id, quote.price, Instant::now());
                Ok(PricedQuote {
                    asset_id: asset_id.to_string(),
                    price: quote.price,
                    source: PriceSource::Oracle,
                    previous: cache.previous(asset_id),
                })
            }
            Err(e) => match spec.fallback_price {
                Some(price) => {
                    warn!(asset_id, error = %e, fallback = %price, "oracle failed; using fallback price");
                    Ok(PricedQuote {
                        asset_id: asset_id.to_string(),
                        price,
                        source: PriceSource::Fallback,
                        previous: None,
                    })
                }
                None => Err(PricingError::Unavailable {
                    asset_id: asset_id.to_string(),
                    reason: e.to_string(),
                }),
            },
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, PriceCache> {
        // A poisoned cache still holds valid prices.
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }
}
