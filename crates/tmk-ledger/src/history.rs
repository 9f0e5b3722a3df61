//! Rebuilding a ledger from raw transaction history.
//!
//! Records arrive unordered, possibly for many assets, with numeric fields
//! still in whatever form the store returned them. [`build_ledger`] filters
//! to one asset, sorts into replay order and feeds each record through the
//! ledger.
//!
//! # Replay order
//!
//! `(timestamp, kind_ord, input index)` ascending, where buys sort before
//! sells on a tied timestamp so lots are opened before they are closed.
//!
//! # Malformed records
//!
//! Under [`CoercionPolicy::Lenient`] a quantity that does not parse (or is
//! not positive) becomes `1` and a price that does not parse (or is
//! negative) becomes `0`, so one bad row cannot abort an asset's history.
//! Every coerced record is counted in [`ReplayReport::coerced`] and logged.
//! [`CoercionPolicy::Strict`] turns the same records into
//! [`HistoryError::MalformedRecord`]. Values with more than six decimals
//! are rounded half away from zero, not coerced.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fixedpoint::{Micros, Qty};
use crate::ledger::{FifoLedger, LedgerError};
use crate::types::OversellPolicy;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Transaction type tag. Tags other than buy/sell are kept and skipped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TxKind {
    Buy,
    Sell,
    Other(String),
}

impl From<String> for TxKind {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "purchase" => TxKind::Buy,
            "sell" | "sale" => TxKind::Sell,
            _ => TxKind::Other(s),
        }
    }
}

impl From<TxKind> for String {
    fn from(k: TxKind) -> Self {
        match k {
            TxKind::Buy => "buy".to_string(),
            TxKind::Sell => "sell".to_string(),
            TxKind::Other(s) => s,
        }
    }
}

impl TxKind {
    fn replay_ord(&self) -> u8 {
        match self {
            TxKind::Buy => 0,
            TxKind::Sell => 1,
            TxKind::Other(_) => 2,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// A numeric field exactly as the feed delivered it.
///
/// Accepts JSON strings and numbers; anything else becomes an empty string
/// and fails to parse at replay time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NumberOrText")]
pub struct RawDecimal(pub String);

impl From<NumberOrText> for RawDecimal {
    fn from(v: NumberOrText) -> Self {
        match v {
            NumberOrText::Int(i) => RawDecimal(i.to_string()),
            NumberOrText::Float(f) => RawDecimal(f.to_string()),
            NumberOrText::Text(s) => RawDecimal(s),
            NumberOrText::Other(_) => RawDecimal(String::new()),
        }
    }
}

impl From<&str> for RawDecimal {
    fn from(s: &str) -> Self {
        RawDecimal(s.to_string())
    }
}

/// One transaction as supplied by a feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub asset_id: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    #[serde(default)]
    pub quantity: Option<RawDecimal>,
    #[serde(default)]
    pub price: Option<RawDecimal>,
    pub timestamp: DateTime<Utc>,
}

impl TxRecord {
    pub fn new<S: Into<String>>(
        asset_id: S,
        kind: TxKind,
        quantity: &str,
        price: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            kind,
            quantity: Some(RawDecimal::from(quantity)),
            price: Some(RawDecimal::from(price)),
            timestamp,
        }
    }

    pub fn buy<S: Into<String>>(asset_id: S, quantity: &str, price: &str, ts: DateTime<Utc>) -> Self {
        Self::new(asset_id, TxKind::Buy, quantity, price, ts)
    }

    pub fn sell<S: Into<String>>(asset_id: S, quantity: &str, price: &str, ts: DateTime<Utc>) -> Self {
        Self::new(asset_id, TxKind::Sell, quantity, price, ts)
    }
}

// ---------------------------------------------------------------------------
// Options / report / errors
// ---------------------------------------------------------------------------

/// How to treat records whose numeric fields are unusable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// Default quantity to 1 and price to 0, count and log the record.
    #[default]
    Lenient,
    /// Fail the replay.
    Strict,
}

impl CoercionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoercionPolicy::Lenient => "lenient",
            CoercionPolicy::Strict => "strict",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Some(CoercionPolicy::Lenient),
            "strict" => Some(CoercionPolicy::Strict),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    pub coercion: CoercionPolicy,
    pub oversell: OversellPolicy,
}

impl ReplayOptions {
    /// Resolve policies from their config names (`clip`, `lenient`, ...).
    pub fn from_names(oversell: &str, coercion: &str) -> Result<Self, UnknownPolicy> {
        let oversell = OversellPolicy::parse(oversell).ok_or_else(|| UnknownPolicy {
            kind: "oversell",
            value: oversell.to_string(),
            expected: "clip | reject",
        })?;
        let coercion = CoercionPolicy::parse(coercion).ok_or_else(|| UnknownPolicy {
            kind: "coercion",
            value: coercion.to_string(),
            expected: "lenient | strict",
        })?;
        Ok(Self { coercion, oversell })
    }
}

/// A policy name that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicy {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl fmt::Display for UnknownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} policy '{}'. expected one of: {}",
            self.kind, self.value, self.expected
        )
    }
}

impl std::error::Error for UnknownPolicy {}

/// Counters collected while replaying one asset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub purchases: usize,
    pub sales: usize,
    /// Records whose quantity or price was replaced by a default.
    pub coerced: usize,
    /// Records with a type tag other than buy/sell.
    pub skipped: usize,
    /// Total sale quantity dropped for lack of open lots.
    pub clipped: Qty,
}

/// A rebuilt ledger plus what happened while building it.
#[derive(Clone, Debug)]
pub struct Replay {
    pub ledger: FifoLedger,
    pub report: ReplayReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Strict mode: a numeric field was missing, unparsable or out of range.
    MalformedRecord {
        index: usize,
        asset_id: String,
        field: &'static str,
        raw: String,
    },
    /// The ledger refused a record (only `InsufficientLots` is reachable).
    Ledger { index: usize, source: LedgerError },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::MalformedRecord {
                index,
                asset_id,
                field,
                raw,
            } => write!(
                f,
                "record {index} ({asset_id}): malformed {field} '{raw}'"
            ),
            HistoryError::Ledger { index, source } => write!(f, "record {index}: {source}"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Ledger { source, .. } => Some(source),
            HistoryError::MalformedRecord { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Sort record references into replay order in place.
pub fn sort_for_replay(records: &mut [(usize, &TxRecord)]) {
    records.sort_by(|(ia, a), (ib, b)| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.kind.replay_ord().cmp(&b.kind.replay_ord()))
            .then_with(|| ia.cmp(ib))
    });
}

/// Build the ledger for `asset_id` from an unordered multi-asset history.
///
/// `index` values in errors and logs refer to positions in `records`.
pub fn build_ledger(
    asset_id: &str,
    records: &[TxRecord],
    opts: ReplayOptions,
) -> Result<Replay, HistoryError> {
    let mut selected: Vec<(usize, &TxRecord)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.asset_id == asset_id)
        .collect();
    sort_for_replay(&mut selected);

    let mut ledger = FifoLedger::with_policy(opts.oversell);
    let mut report = ReplayReport::default();

    for (index, rec) in selected {
        if let TxKind::Other(tag) = &rec.kind {
            debug!(index, asset_id, tag = %tag, "skipping record with unknown type");
            report.skipped += 1;
            continue;
        }

        let (quantity, price, coerced) = resolve_numbers(index, rec, opts.coercion)?;
        if coerced {
            report.coerced += 1;
        }

        match rec.kind {
            TxKind::Buy => {
                ledger
                    .record_purchase(quantity, price, rec.timestamp)
                    .map_err(|source| HistoryError::Ledger { index, source })?;
                report.purchases += 1;
            }
            TxKind::Sell => {
                let out = ledger
                    .record_sale(quantity, price, rec.timestamp)
                    .map_err(|source| HistoryError::Ledger { index, source })?;
                report.clipped = report.clipped.saturating_add(out.clipped);
                report.sales += 1;
            }
            TxKind::Other(_) => {}
        }
    }

    if report.coerced > 0 {
        warn!(asset_id, coerced = report.coerced, "history replay coerced malformed records");
    }
    Ok(Replay { ledger, report })
}

fn resolve_numbers(
    index: usize,
    rec: &TxRecord,
    policy: CoercionPolicy,
) -> Result<(Qty, Micros, bool), HistoryError> {
    let raw_qty = rec.quantity.as_ref().map(|r| r.0.as_str()).unwrap_or("");
    let raw_price = rec.price.as_ref().map(|r| r.0.as_str()).unwrap_or("");

    // Feeds may carry more precision than the ledger keeps; round, don't coerce.
    let quantity = Qty::parse_rounded(raw_qty).ok().filter(|q| q.is_positive());
    let price = Micros::parse_rounded(raw_price).ok().filter(|p| !p.is_negative());

    let malformed = |field: &'static str, raw: &str| HistoryError::MalformedRecord {
        index,
        asset_id: rec.asset_id.clone(),
        field,
        raw: raw.to_string(),
    };

    match (quantity, price, policy) {
        (Some(q), Some(p), _) => Ok((q, p, false)),
        (None, _, CoercionPolicy::Strict) => Err(malformed("quantity", raw_qty)),
        (_, None, CoercionPolicy::Strict) => Err(malformed("price", raw_price)),
        (q, p, CoercionPolicy::Lenient) => {
            warn!(
                index,
                asset_id = %rec.asset_id,
                quantity = raw_qty,
                price = raw_price,
                "coercing malformed record"
            );
            Ok((
                q.unwrap_or(Qty::from_units(1)),
                p.unwrap_or(Micros::ZERO),
                true,
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
