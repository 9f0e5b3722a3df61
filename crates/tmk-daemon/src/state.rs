//! Shared runtime state for tmk-daemon.
//!
//! Each asset's ledger sits behind its own async mutex so writers to
//! different assets never contend. The outer map is only write-locked to
//! create a missing entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tmk_ledger::{FifoLedger, ReplayOptions};
use tmk_md::{PricingService, TransactionFeed};
use tokio::sync::{broadcast, Mutex, RwLock};

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Ledger(LedgerEvent),
}

/// Emitted after every successful ledger mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub asset_id: String,
    /// "purchase" | "sale" | "replay" | "reset"
    pub action: String,
    pub open_quantity: String,
    pub realized_gain_loss: String,
    pub percent_change: String,
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub type LedgerHandle = Arc<Mutex<FifoLedger>>;

/// Shared across all Axum handlers behind an `Arc`.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    /// Replay and oversell policies for every ledger.
    pub options: ReplayOptions,
    ledgers: RwLock<HashMap<String, LedgerHandle>>,
    /// `None` when no assets are configured; price routes answer 503.
    pub pricing: Option<Arc<PricingService>>,
    /// History source for owner-based replay.
    pub feed: Option<Arc<dyn TransactionFeed>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "tmk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            options: ReplayOptions::default(),
            ledgers: RwLock::new(HashMap::new()),
            pricing: None,
            feed: None,
        }
    }

    pub fn with_options(mut self, options: ReplayOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingService) -> Self {
        self.pricing = Some(Arc::new(pricing));
        self
    }

    pub fn with_feed(mut self, feed: Arc<dyn TransactionFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Ledger for `asset_id`, created empty on first reference.
    pub async fn ledger(&self, asset_id: &str) -> LedgerHandle {
        if let Some(h) = self.ledgers.read().await.get(asset_id) {
            return Arc::clone(h);
        }
        let mut map = self.ledgers.write().await;
        let oversell = self.options.oversell;
        Arc::clone(
            map.entry(asset_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(FifoLedger::with_policy(oversell)))),
        )
    }

    /// Ledger for `asset_id` if one was ever created.
    pub async fn existing_ledger(&self, asset_id: &str) -> Option<LedgerHandle> {
        self.ledgers.read().await.get(asset_id).cloned()
    }
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
