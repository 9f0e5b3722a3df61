use anyhow::{Context, Result};
use tmk_ledger::format_currency;
use tmk_md::PricingService;

pub async fn run(config_paths: &[String], asset: &str) -> Result<()> {
    let loaded = super::load_config(config_paths)?;
    let market = loaded.market()?;
    let secrets = tmk_config::resolve_secrets(&loaded.config_json)?;

    let svc = PricingService::from_config(&market, secrets.store_api_key.as_deref())
        .context("failed to build asset registry")?;
    let q = svc
        .price(asset)
        .await
        .with_context(|| format!("price lookup failed for '{asset}'"))?;

    println!("asset={}", q.asset_id);
    println!("price={}", format_currency(q.price));
    println!("source={}", q.source.as_str());
    if let Some(prev) = q.previous {
        println!("previous={}", format_currency(prev));
    }
    Ok(())
}
