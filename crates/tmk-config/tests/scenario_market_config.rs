use tmk_config::load_layered_yaml_from_strings;

const YAML: &str = r#"
ledger:
  oversell_policy: reject
prices:
  cache_ttl_secs: 10
  cache_capacity: 8
store:
  base_url: "https://store.example.com"
  keys_env:
    api_key: "TMK_STORE_API_KEY"
assets:
  - id: "pokemon-base-charizard"
    name: "Charizard (Base Set)"
    table: "charizard_prices"
    fallback_price: "350.00"
  - id: "house-token"
    oracle: "static"
    fallback_price: "12.5"
"#;

#[test]
fn typed_view_reads_every_section() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let m = loaded.market().unwrap();

    assert_eq!(m.ledger.oversell_policy, "reject");
    assert_eq!(m.ledger.coercion_policy, "lenient");
    assert_eq!(m.prices.cache_capacity, 8);
    assert_eq!(
        m.store.as_ref().map(|s| s.base_url.as_str()),
        Some("https://store.example.com")
    );
    assert_eq!(m.assets.len(), 2);
    assert_eq!(m.assets[0].oracle, "rest");
    assert_eq!(m.assets[0].table.as_deref(), Some("charizard_prices"));
    assert_eq!(m.assets[1].oracle, "static");
    assert_eq!(m.assets[1].fallback_price.as_deref(), Some("12.5"));
}

#[test]
fn numeric_fallback_price_is_rejected_by_shape() {
    // Prices are decimal strings so they never pass through a float.
    let yaml = r#"
assets:
  - id: "x"
    oracle: static
    fallback_price: 12.5
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    assert!(loaded.market().is_err());
}
