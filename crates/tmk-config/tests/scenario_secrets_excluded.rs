//! Literal secrets are refused; env var names load and resolve by name.

use tmk_config::{load_layered_yaml_from_strings, resolve_secrets};

#[test]
fn literal_secret_is_rejected() {
    let yaml = r#"
store:
  base_url: "https://store.example.com"
  keys_env:
    api_key: "sk-live-abc123secretvalue"
"#;
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err().to_string();
    assert!(err.contains("CONFIG_SECRET_DETECTED"), "{err}");
    assert!(err.contains("/store/keys_env/api_key"), "{err}");
    assert!(!err.contains("abc123"), "value must be redacted: {err}");
}

#[test]
fn jwt_literal_is_rejected() {
    let yaml = r#"
store:
  keys_env:
    api_key: "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.e30.sig"
"#;
    assert!(load_layered_yaml_from_strings(&[yaml]).is_err());
}

#[test]
fn missing_required_key_names_the_variable() {
    let yaml = r#"
store:
  base_url: "https://store.example.com"
  keys_env:
    api_key: "TMK_SENTINEL_STORE_KEY_NEVER_SET_7Q"
"#;
    let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let err = resolve_secrets(&cfg.config_json).unwrap_err().to_string();
    assert!(err.contains("SECRETS_MISSING"), "{err}");
    assert!(err.contains("TMK_SENTINEL_STORE_KEY_NEVER_SET_7Q"), "{err}");
}

#[test]
fn no_store_means_key_is_optional() {
    let yaml = r#"
store_disabled: true
"#;
    let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let s = resolve_secrets(&cfg.config_json).unwrap();
    let dbg = format!("{s:?}");
    assert!(dbg.contains("ResolvedSecrets"));
}

#[test]
fn debug_output_is_redacted() {
    let s = tmk_config::ResolvedSecrets {
        store_api_key: Some("super-secret-value".to_string()),
    };
    let dbg = format!("{s:?}");
    assert!(dbg.contains("<REDACTED>"));
    assert!(!dbg.contains("super-secret-value"));
}
