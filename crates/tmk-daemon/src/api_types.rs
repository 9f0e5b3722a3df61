//! Request and response types for all tmk-daemon HTTP endpoints.
//!
//! Quantities and amounts cross the wire as decimal strings so no value
//! ever passes through a float. Amount fields carry six decimals; the
//! `formatted` block carries display strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tmk_ledger::{
    format_currency, format_percent, format_qty, FifoLedger, LotMatch, Notional, RawDecimal,
    ReplayReport, SaleOutcome, TxRecord,
};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable kind: "invalid_input" | "insufficient_lots" |
    /// "malformed_record" | "unknown_asset" | "pricing_unavailable" |
    /// "pricing_not_configured" | "feed_error"
    pub kind: String,
}

impl ErrorResponse {
    pub fn new(kind: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotView {
    pub quantity: String,
    pub unit_price: String,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryView {
    pub total_gain_loss: String,
    pub percent_change: String,
    pub cost_basis: String,
    pub proceeds: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedSummary {
    pub total_gain_loss: String,
    pub percent_change: String,
    pub open_quantity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerView {
    pub asset_id: String,
    pub open_quantity: String,
    pub lots: Vec<LotView>,
    pub summary: SummaryView,
    pub formatted: FormattedSummary,
}

impl LedgerView {
    pub fn of(asset_id: &str, ledger: &FifoLedger) -> Self {
        let s = ledger.summary();
        Self {
            asset_id: asset_id.to_string(),
            open_quantity: ledger.open_quantity().to_string(),
            lots: ledger
                .lots()
                .iter()
                .map(|l| LotView {
                    quantity: l.quantity.to_string(),
                    unit_price: l.unit_price.to_string(),
                    acquired_at: l.timestamp,
                })
                .collect(),
            summary: SummaryView {
                total_gain_loss: s.total_gain_loss.to_string(),
                percent_change: s.percent_change.to_string(),
                cost_basis: s.cost_basis.to_string(),
                proceeds: s.proceeds.to_string(),
            },
            formatted: FormattedSummary {
                total_gain_loss: format_currency(s.total_gain_loss),
                percent_change: format_percent(s.percent_change),
                open_quantity: format_qty(ledger.open_quantity()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/ledgers/:asset/purchases  /sales
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    /// JSON number or decimal string, > 0, at most six decimals.
    pub quantity: RawDecimal,
    /// JSON number or decimal string, >= 0, at most six decimals.
    pub price: RawDecimal,
    /// Defaults to the time the request is handled.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    pub lot_acquired_at: DateTime<Utc>,
    pub quantity: String,
    pub unit_cost: String,
    pub gain_loss: String,
}

impl From<&LotMatch> for MatchView {
    fn from(m: &LotMatch) -> Self {
        Self {
            lot_acquired_at: m.lot_timestamp,
            quantity: m.quantity.to_string(),
            unit_cost: m.unit_cost.to_string(),
            gain_loss: amount(m.gain_loss),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleResponse {
    pub requested: String,
    pub matched: String,
    /// Non-zero only under the clip oversell policy.
    pub clipped: String,
    pub cost_basis: String,
    pub proceeds: String,
    pub gain_loss: String,
    pub matches: Vec<MatchView>,
    pub ledger: LedgerView,
}

impl SaleResponse {
    pub fn of(outcome: &SaleOutcome, ledger: LedgerView) -> Self {
        Self {
            requested: outcome.requested.to_string(),
            matched: outcome.matched.to_string(),
            clipped: outcome.clipped.to_string(),
            cost_basis: amount(outcome.cost_basis),
            proceeds: amount(outcome.proceeds),
            gain_loss: amount(outcome.gain_loss),
            matches: outcome.matches.iter().map(MatchView::from).collect(),
            ledger,
        }
    }
}

fn amount(n: Notional) -> String {
    n.to_micros().to_string()
}

// ---------------------------------------------------------------------------
// POST /v1/ledgers/:asset/replay
// ---------------------------------------------------------------------------

/// Either inline records or an owner whose history the daemon's feed
/// fetches. Inline records win when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayRequest {
    #[serde(default)]
    pub records: Option<Vec<TxRecord>>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResponse {
    pub purchases: usize,
    pub sales: usize,
    pub coerced: usize,
    pub skipped: usize,
    pub clipped: String,
    pub ledger: LedgerView,
}

impl ReplayResponse {
    pub fn of(report: &ReplayReport, ledger: LedgerView) -> Self {
        Self {
            purchases: report.purchases,
            sales: report.sales,
            coerced: report.coerced,
            skipped: report.skipped,
            clipped: report.clipped.to_string(),
            ledger,
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/prices/:asset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    pub asset_id: String,
    pub price: String,
    pub formatted: String,
    /// "cache" | "oracle" | "fallback"
    pub source: String,
    pub previous: Option<String>,
}
