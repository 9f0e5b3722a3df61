//! Asset id → capability record, built once from config.

use std::collections::BTreeMap;
use std::fmt;

use tmk_config::AssetConfig;
use tmk_ledger::Micros;

/// Everything the pricing layer needs to know about one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub asset_id: String,
    pub display_name: String,
    /// Store table with the asset's price rows (REST oracle only).
    pub table: Option<String>,
    pub fallback_price: Option<Micros>,
    /// Name of the oracle that prices this asset.
    pub oracle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    UnknownAsset(String),
    DuplicateAsset(String),
    InvalidFallbackPrice { asset_id: String, raw: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownAsset(id) => write!(f, "unknown asset '{id}'"),
            RegistryError::DuplicateAsset(id) => write!(f, "asset '{id}' configured twice"),
            RegistryError::InvalidFallbackPrice { asset_id, raw } => {
                write!(f, "asset '{asset_id}': invalid fallback_price '{raw}'")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: BTreeMap<String, AssetSpec>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(assets: &[AssetConfig]) -> Result<Self, RegistryError> {
        let mut reg = Self::new();
        for a in assets {
            let fallback_price = match a.fallback_price.as_deref() {
                None => None,
                Some(raw) => Some(
                    Micros::parse(raw)
                        .ok()
                        .filter(|p| !p.is_negative())
                        .ok_or_else(|| RegistryError::InvalidFallbackPrice {
                            asset_id: a.id.clone(),
                            raw: raw.to_string(),
                        })?,
                ),
            };
            reg.register(AssetSpec {
                asset_id: a.id.clone(),
                display_name: a.name.clone().unwrap_or_else(|| a.id.clone()),
                table: a.table.clone(),
                fallback_price,
                oracle: a.oracle.clone(),
            })?;
        }
        Ok(reg)
    }

    pub fn register(&mut self, spec: AssetSpec) -> Result<(), RegistryError> {
        if self.assets.contains_key(&spec.asset_id) {
            return Err(RegistryError::DuplicateAsset(spec.asset_id));
        }
        self.assets.insert(spec.asset_id.clone(), spec);
        Ok(())
    }

    pub fn get(&self, asset_id: &str) -> Result<&AssetSpec, RegistryError> {
        self.assets
            .get(asset_id)
            .ok_or_else(|| RegistryError::UnknownAsset(asset_id.to_string()))
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.assets.contains_key(asset_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(id: &str, fallback: Option<&str>) -> AssetConfig {
        AssetConfig {
            id: id.to_string(),
            name: None,
            table: Some(format!("{id}_prices")),
            fallback_price: fallback.map(str::to_string),
            oracle: "rest".to_string(),
        }
    }

    #[test]
    fn builds_and_looks_up() {
        let reg = AssetRegistry::from_config(&[cfg("a", Some("350.00")), cfg("b", None)]).unwrap();
        let a = reg.get("a").unwrap();
        assert_eq!(a.fallback_price, Some(Micros::from_tokens(350)));
        assert_eq!(a.display_name, "a");
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            reg.get("zzz").unwrap_err(),
            RegistryError::UnknownAsset("zzz".to_string())
        );
    }

    #[test]
    fn duplicate_ids_fail() {
        let err = AssetRegistry::from_config(&[cfg("a", None), cfg("a", None)]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAsset("a".to_string()));
    }

    #[test]
    fn bad_fallback_fails() {
        for raw in ["abc", "-1"] {
            let err = AssetRegistry::from_config(&[cfg("a", Some(raw))]).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidFallbackPrice { .. }));
        }
    }
}
