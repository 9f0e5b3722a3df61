//! Hashing determinism of the layered loader.

use tmk_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
ledger:
  oversell_policy: "clip"
  coercion_policy: "lenient"
prices:
  cache_ttl_secs: 30
store:
  base_url: "https://store.example.com"
  keys_env:
    api_key: "TMK_STORE_API_KEY"
"#;

const BASE_YAML_REORDERED: &str = r#"
store:
  keys_env:
    api_key: "TMK_STORE_API_KEY"
  base_url: "https://store.example.com"
prices:
  cache_ttl_secs: 30
ledger:
  coercion_policy: "lenient"
  oversell_policy: "clip"
"#;

const OVERLAY_YAML: &str = r#"
ledger:
  oversell_policy: "reject"
"#;

#[test]
fn same_input_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.config_hash.len(), 64);
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);

    assert_eq!(
        merged.config_json.pointer("/ledger/oversell_policy").unwrap(),
        "reject"
    );
    // untouched siblings survive the merge
    assert_eq!(
        merged.config_json.pointer("/ledger/coercion_policy").unwrap(),
        "lenient"
    );
}

#[test]
fn load_from_files_matches_strings() {
    let dir = std::env::temp_dir().join(format!("tmk-config-hash-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let base = dir.join("base.yaml");
    let over = dir.join("overlay.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&over, OVERLAY_YAML).unwrap();

    let from_files = tmk_config::load_layered_yaml(&[
        base.to_str().unwrap(),
        over.to_str().unwrap(),
    ])
    .unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);

    let _ = std::fs::remove_dir_all(&dir);
}
