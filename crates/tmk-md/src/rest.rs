//! Store REST proxy clients.
//!
//! The store exposes tables through a PostgREST-style proxy: filters and
//! ordering travel as query parameters, and every request carries the
//! project key both as `apikey` and as a bearer token. The key is passed
//! in by the caller; never log it.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tmk_ledger::{Micros, RawDecimal, TxRecord};
use tracing::debug;

use crate::error::SourceError;
use crate::feed::TransactionFeed;
use crate::oracle::{PriceOracle, PriceQuote};
use crate::registry::AssetSpec;

#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl StoreClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SourceError> {
        let url = self.table_url(table);
        debug!(%url, "store select");

        let resp = self
            .http
            .get(url)
            .query(query)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<Vec<T>>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    price: RawDecimal,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Newest row of the asset's price table.
#[derive(Debug, Clone)]
pub struct RestPriceOracle {
    client: StoreClient,
}

impl RestPriceOracle {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PriceOracle for RestPriceOracle {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn latest_price(&self, asset: &AssetSpec) -> Result<PriceQuote, SourceError> {
        let table = asset
            .table
            .as_deref()
            .ok_or_else(|| SourceError::NotFound(format!("price table for '{}'", asset.asset_id)))?;

        let rows: Vec<PriceRow> = self
            .client
            .select(
                table,
                &[
                    ("select", "price,created_at".to_string()),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(format!("price rows in '{table}'")))?;

        let price = Micros::parse_rounded(&row.price.0)
            .map_err(|e| SourceError::Decode(format!("{table}.price: {e}")))?;

        Ok(PriceQuote {
            asset_id: asset.asset_id.clone(),
            price,
            observed_at: row.created_at,
        })
    }
}

/// A user's transactions, oldest first.
#[derive(Debug, Clone)]
pub struct RestTransactionFeed {
    client: StoreClient,
}

impl RestTransactionFeed {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl TransactionFeed for RestTransactionFeed {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn fetch_transactions(&self, owner: &str) -> Result<Vec<TxRecord>, SourceError> {
        self.client
            .select(
                "transactions",
                &[
                    (
                        "select",
                        "asset_id,type,quantity,price,timestamp".to_string(),
                    ),
                    ("user_id", format!("eq.{owner}")),
                    ("order", "timestamp.asc".to_string()),
                ],
            )
            .await
    }
}
