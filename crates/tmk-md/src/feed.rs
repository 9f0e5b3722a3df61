//! Transaction history sources.

use tmk_ledger::TxRecord;

use crate::error::SourceError;

#[async_trait::async_trait]
pub trait TransactionFeed: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every transaction recorded for `owner`, across all assets.
    ///
    /// Order is not guaranteed; replay sorts.
    async fn fetch_transactions(&self, owner: &str) -> Result<Vec<TxRecord>, SourceError>;
}

/// Fixed history, same for every owner.
#[derive(Debug, Clone, Default)]
pub struct StaticTransactionFeed {
    records: Vec<TxRecord>,
}

impl StaticTransactionFeed {
    pub fn new(records: Vec<TxRecord>) -> Self {
        Self { records }
    }
}

#[async_trait::async_trait]
impl TransactionFeed for StaticTransactionFeed {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_transactions(&self, _owner: &str) -> Result<Vec<TxRecord>, SourceError> {
        Ok(self.records.clone())
    }
}
