//! tmk-md
//!
//! Market data for the token market: asset registry, price oracles, the
//! price cache and pricing service, and transaction history sources.
//!
//! Nothing here touches a ledger; callers fetch records and prices and
//! hand them to `tmk-ledger`.

pub mod cache;
pub mod feed;
pub mod ingest;
pub mod oracle;
pub mod pricing;
pub mod registry;
pub mod rest;

mod error;

pub use cache::{CachedPrice, PriceCache};
pub use error::SourceError;
pub use feed::{StaticTransactionFeed, TransactionFeed};
pub use ingest::{parse_history_csv_str, parse_history_file, parse_history_json_str, IngestError};
pub use oracle::{PriceOracle, PriceQuote, StaticPriceOracle};
pub use pricing::{PriceSource, PricedQuote, PricingError, PricingService};
pub use registry::{AssetRegistry, AssetSpec, RegistryError};
pub use rest::{RestPriceOracle, RestTransactionFeed, StoreClient};
