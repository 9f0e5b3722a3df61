//! Command handler modules for tmk.
//!
//! Shared helpers live here; command logic lives in the submodules.

pub mod gains;
pub mod price;

use anyhow::{Context, Result};
use tmk_config::{report_unused_keys, ConfigMode, LoadedConfig, UnusedKeyPolicy};
use tmk_ledger::{CoercionPolicy, OversellPolicy, ReplayOptions};
use tracing::warn;

/// Load layered config and warn about keys this binary never reads.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let loaded = tmk_config::load_layered_yaml(paths)?;
    let report = report_unused_keys(ConfigMode::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has keys tmk does not read");
    }
    Ok(loaded)
}

/// Ledger policies: config (if any) first, then flags on top.
pub fn replay_options(
    config_paths: &[String],
    strict: bool,
    reject_oversell: bool,
) -> Result<ReplayOptions> {
    let mut opts = ReplayOptions::default();

    if !config_paths.is_empty() {
        let market = load_config(config_paths)?.market()?;
        opts = ReplayOptions::from_names(
            &market.ledger.oversell_policy,
            &market.ledger.coercion_policy,
        )
        .context("invalid /ledger section")?;
    }

    if strict {
        opts.coercion = CoercionPolicy::Strict;
    }
    if reject_oversell {
        opts.oversell = OversellPolicy::Reject;
    }
    Ok(opts)
}
