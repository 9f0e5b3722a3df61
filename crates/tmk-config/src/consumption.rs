//! Registry of config keys each binary actually reads.
//!
//! Entries are JSON-pointer prefixes; a leaf under any prefix counts as
//! consumed. Keep this in step with the reads in `market.rs` and
//! `secrets.rs`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    /// `tmk` command-line tool.
    Cli,
    /// `tmk-daemon` HTTP service.
    Daemon,
}

impl ConfigMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigMode::Cli => "CLI",
            ConfigMode::Daemon => "DAEMON",
        }
    }
}

pub fn consumed_pointers_for_mode(mode: ConfigMode) -> &'static [&'static str] {
    match mode {
        ConfigMode::Cli => CLI,
        ConfigMode::Daemon => DAEMON,
    }
}

static CLI: &[&str] = &[
    "/ledger/oversell_policy",
    "/ledger/coercion_policy",
    "/prices/cache_ttl_secs",
    "/prices/cache_capacity",
    "/store/base_url",
    "/store/keys_env/api_key",
    // every field of every entry is read by AssetRegistry::from_config
    "/assets",
];

static DAEMON: &[&str] = &[
    "/ledger/oversell_policy",
    "/ledger/coercion_policy",
    "/prices/cache_ttl_secs",
    "/prices/cache_capacity",
    "/store/base_url",
    "/store/keys_env/api_key",
    "/assets",
    "/daemon/addr",
];
