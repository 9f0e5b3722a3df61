//! Store credential resolution.
//!
//! Config stores only env var NAMES (`/store/keys_env/api_key`). Binaries
//! call [`resolve_secrets`] once at startup and pass the result into
//! constructors. Values are redacted in `Debug`; errors name the variable,
//! never its value.

use anyhow::{bail, Result};
use serde_json::Value;

/// Used when the config does not name a variable.
pub const DEFAULT_STORE_API_KEY_VAR: &str = "TMK_STORE_API_KEY";

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Store REST proxy key. `None` if no store is configured.
    pub store_api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "store_api_key",
                &self.store_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve store credentials from the environment.
///
/// When `/store/base_url` is set the key is required; otherwise it is
/// optional and silently `None` when absent.
pub fn resolve_secrets(config_json: &Value) -> Result<ResolvedSecrets> {
    let var = read_str_at(config_json, "/store/keys_env/api_key")
        .unwrap_or_else(|| DEFAULT_STORE_API_KEY_VAR.to_string());
    let store_api_key = resolve_env(&var);

    if read_str_at(config_json, "/store/base_url").is_some() && store_api_key.is_none() {
        bail!(
            "SECRETS_MISSING: required env var '{}' (store api_key) is not set or empty",
            var
        );
    }

    Ok(ResolvedSecrets { store_api_key })
}
