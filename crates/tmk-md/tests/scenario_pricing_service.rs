//! Cache → oracle → fallback resolution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tmk_config::AssetConfig;
use tmk_ledger::Micros;
use tmk_md::{
    AssetRegistry, AssetSpec, PriceCache, PriceOracle, PriceQuote, PriceSource, PricingError,
    PricingService, RegistryError, SourceError, StaticPriceOracle,
};

/// Counts calls and answers with a price that rises by one token per call.
struct CountingOracle {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl PriceOracle for CountingOracle {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn latest_price(&self, asset: &AssetSpec) -> Result<PriceQuote, SourceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
        Ok(PriceQuote {
            asset_id: asset.asset_id.clone(),
            price: Micros::from_tokens(100 + n),
            observed_at: None,
        })
    }
}

struct FailingOracle;

#[async_trait::async_trait]
impl PriceOracle for FailingOracle {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn latest_price(&self, _asset: &AssetSpec) -> Result<PriceQuote, SourceError> {
        Err(SourceError::Transport("connection refused".to_string()))
    }
}

fn registry() -> AssetRegistry {
    let asset = |id: &str, oracle: &str, fallback: Option<&str>| AssetConfig {
        id: id.to_string(),
        name: None,
        table: Some(format!("{id}_prices")),
        fallback_price: fallback.map(str::to_string),
        oracle: oracle.to_string(),
    };
    AssetRegistry::from_config(&[
        asset("charizard", "rest", Some("350.00")),
        asset("pikachu", "rest", None),
        asset("house", "static", None),
    ])
    .unwrap()
}

#[tokio::test]
async fn second_lookup_is_served_from_cache() {
    let oracle = Arc::new(CountingOracle {
        calls: AtomicUsize::new(0),
    });
    let svc = PricingService::new(registry(), PriceCache::new(Duration::from_secs(60), 16))
        .with_oracle(oracle.clone());

    let first = svc.price("charizard").await.unwrap();
    assert_eq!(first.source, PriceSource::Oracle);
    assert_eq!(first.price, Micros::from_tokens(100));

    let second = svc.price("charizard").await.unwrap();
    assert_eq!(second.source, PriceSource::Cache);
    assert_eq!(second.price, Micros::from_tokens(100));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_entry_refetches_and_reports_previous() {
    let oracle = Arc::new(CountingOracle {
        calls: AtomicUsize::new(0),
    });
    let svc = PricingService::new(registry(), PriceCache::new(Duration::ZERO, 16))
        .with_oracle(oracle.clone());

    svc.price("charizard").await.unwrap();
    let second = svc.price("charizard").await.unwrap();
    assert_eq!(second.source, PriceSource::Oracle);
    assert_eq!(second.price, Micros::from_tokens(101));
    assert_eq!(second.previous, Some(Micros::from_tokens(100)));
}

#[tokio::test]
async fn oracle_failure_uses_fallback() {
    let svc = PricingService::new(registry(), PriceCache::new(Duration::from_secs(60), 16))
        .with_oracle(Arc::new(FailingOracle));

    let q = svc.price("charizard").await.unwrap();
    assert_eq!(q.source, PriceSource::Fallback);
    assert_eq!(q.price, Micros::from_tokens(350));

    let err = svc.price("pikachu").await.unwrap_err();
    assert!(matches!(err, PricingError::Unavailable { .. }));
}

#[tokio::test]
async fn static_assets_use_static_oracle() {
    let svc = PricingService::new(registry(), PriceCache::new(Duration::from_secs(60), 16))
        .with_oracle(Arc::new(FailingOracle))
        .with_oracle(Arc::new(
            StaticPriceOracle::new().with_price("house", Micros::new(12_500_000)),
        ));

    let q = svc.price("house").await.unwrap();
    assert_eq!(q.source, PriceSource::Oracle);
    assert_eq!(q.price, Micros::new(12_500_000));
}

#[tokio::test]
async fn unknown_asset_is_a_registry_error() {
    let svc = PricingService::new(registry(), PriceCache::new(Duration::from_secs(60), 16));
    let err = svc.price("mew").await.unwrap_err();
    assert_eq!(
        err,
        PricingError::Registry(RegistryError::UnknownAsset("mew".to_string()))
    );
}

#[tokio::test]
async fn from_config_prices_static_assets_and_falls_back_without_store() {
    let yaml = r#"
prices:
  cache_ttl_secs: 5
  cache_capacity: 4
assets:
  - id: "house"
    oracle: "static"
    fallback_price: "12.5"
  - id: "charizard"
    table: "charizard_prices"
    fallback_price: "350.00"
"#;
    let cfg = tmk_config::load_layered_yaml_from_strings(&[yaml])
        .unwrap()
        .market()
        .unwrap();
    let svc = PricingService::from_config(&cfg, None).unwrap();

    let house = svc.price("house").await.unwrap();
    assert_eq!(house.source, PriceSource::Oracle);
    assert_eq!(house.price, Micros::new(12_500_000));

    let charizard = svc.price("charizard").await.unwrap();
    assert_eq!(charizard.source, PriceSource::Fallback);
    assert_eq!(charizard.price, Micros::from_tokens(350));
}
