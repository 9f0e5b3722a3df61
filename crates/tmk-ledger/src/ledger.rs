//! FIFO ledger for a single asset.
//!
//! # Purpose
//! [`FifoLedger`] keeps the open purchase lots of one asset and realizes
//! gain/loss for sales by consuming those lots strictly oldest-first.
//!
//! - Lots stay sorted ascending by timestamp, even when purchases are
//!   recorded out of order.
//! - Inputs are validated on every call; the ledger is **not** mutated when
//!   a call returns an error.
//! - Realized totals are accumulated exactly (see [`Notional`]) and only
//!   rounded when read through [`FifoLedger::summary`].
//!
//! # Usage
//! ```ignore
//! let mut ledger = FifoLedger::new();
//! ledger.record_purchase(Qty::from_units(2), Micros::from_tokens(10), t1)?;
//! ledger.record_sale(Qty::from_units(1), Micros::from_tokens(15), t2)?;
//! let s = ledger.summary();
//! ```
//!
//! # Determinism
//! No IO, no clock, no randomness. Replaying the same history into a fresh
//! ledger always yields the same state, which makes full replay the
//! recovery strategy after any inconsistency.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::fixedpoint::{Micros, Notional, Qty};
use crate::types::{Lot, LotMatch, OversellPolicy, RealizedTotals, SaleOutcome, Summary};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by [`FifoLedger`] mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Quantity was not strictly positive, or a price was negative.
    InvalidInput { field: &'static str, value: String },
    /// A sale exceeded the open quantity under [`OversellPolicy::Reject`].
    InsufficientLots { requested: Qty, available: Qty },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput { field, value } => {
                write!(f, "invalid input: {field} out of range, got {value}")
            }
            Self::InsufficientLots {
                requested,
                available,
            } => write!(
                f,
                "insufficient lots: sale of {requested} exceeds open quantity {available}"
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

// ---------------------------------------------------------------------------
// FifoLedger
// ---------------------------------------------------------------------------

/// Open lots and realized totals for one asset.
#[derive(Clone, Debug, Default)]
pub struct FifoLedger {
    /// Oldest first.
    lots: VecDeque<Lot>,
    realized: RealizedTotals,
    purchased: Qty,
    matched: Qty,
    oversell: OversellPolicy,
}

impl FifoLedger {
    /// Empty ledger with the default [`OversellPolicy::Clip`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(oversell: OversellPolicy) -> Self {
        Self {
            oversell,
            ..Self::default()
        }
    }

    pub fn oversell_policy(&self) -> OversellPolicy {
        self.oversell
    }

    // -----------------------------------------------------------------------
    // Write surface
    // -----------------------------------------------------------------------

    /// Add a lot, keeping lots ordered by timestamp.
    ///
    /// A purchase stamped earlier than existing lots is inserted in front
    /// of them. Equal timestamps keep call order.
    ///
    /// # Errors
    /// [`LedgerError::InvalidInput`] when `quantity <= 0` or
    /// `unit_price < 0`.
    pub fn record_purchase(
        &mut self,
        quantity: Qty,
        unit_price: Micros,
        timestamp: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        validate(quantity, unit_price)?;

        let at = self.lots.partition_point(|l| l.timestamp <= timestamp);
        self.lots
            .insert(at, Lot::new(quantity, unit_price, timestamp));
        self.purchased = self.purchased.saturating_add(quantity);

        debug!(%quantity, %unit_price, %timestamp, position = at, "lot opened");
        Ok(())
    }

    /// Match a sale against open lots, oldest first.
    ///
    /// # Errors
    /// [`LedgerError::InvalidInput`] on bad input;
    /// [`LedgerError::InsufficientLots`] when the sale exceeds the open
    /// quantity and the policy is [`OversellPolicy::Reject`]. Neither error
    /// touches the ledger.
    pub fn record_sale(
        &mut self,
        quantity: Qty,
        unit_price: Micros,
        timestamp: DateTime<Utc>,
    ) -> Result<SaleOutcome, LedgerError> {
        validate(quantity, unit_price)?;

        let available = self.open_quantity();
        if self.oversell == OversellPolicy::Reject && quantity > available {
            return Err(LedgerError::InsufficientLots {
                requested: quantity,
                available,
            });
        }

        let mut remaining = quantity;
        let mut matches = Vec::new();
        let mut sale = RealizedTotals::default();

        while remaining.is_positive() {
            let Some(lot) = self.lots.front_mut() else {
                break;
            };

            let take = remaining.min(lot.quantity);
            let cost_basis = Notional::of(take, lot.unit_price);
            let proceeds = Notional::of(take, unit_price);
            let gain_loss = proceeds - cost_basis;

            lot.quantity = lot.quantity - take;
            let exhausted = lot.quantity.is_zero();
            matches.push(LotMatch {
                lot_timestamp: lot.timestamp,
                quantity: take,
                unit_cost: lot.unit_price,
                cost_basis,
                proceeds,
                gain_loss,
            });
            if exhausted {
                self.lots.pop_front();
            }

            sale.cost_basis += cost_basis;
            sale.proceeds += proceeds;
            sale.gain_loss += gain_loss;
            remaining = remaining - take;
        }

        let matched = quantity - remaining;
        self.matched = self.matched.saturating_add(matched);
        self.realized.cost_basis += sale.cost_basis;
        self.realized.proceeds += sale.proceeds;
        self.realized.gain_loss += sale.gain_loss;

        if remaining.is_positive() {
            warn!(
                requested = %quantity,
                clipped = %remaining,
                "sale exceeds open quantity; remainder dropped"
            );
        }
        debug!(%matched, lots = matches.len(), gain_loss = %sale.gain_loss.to_micros(), "sale matched");

        Ok(SaleOutcome {
            sold_at: timestamp,
            requested: quantity,
            matched,
            clipped: remaining,
            cost_basis: sale.cost_basis,
            proceeds: sale.proceeds,
            gain_loss: sale.gain_loss,
            matches,
        })
    }

    /// Drop all lots and totals. Keeps the oversell policy. Idempotent.
    pub fn reset(&mut self) {
        self.lots.clear();
        self.realized = RealizedTotals::default();
        self.purchased = Qty::ZERO;
        self.matched = Qty::ZERO;
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// Realized gain/loss and percent change, rounded to micros.
    pub fn summary(&self) -> Summary {
        Summary::from(self.realized)
    }

    /// Sum of the remaining lot quantities.
    pub fn open_quantity(&self) -> Qty {
        self.lots.iter().map(|l| l.quantity).sum()
    }

    /// Open lots, oldest first.
    pub fn lots(&self) -> &VecDeque<Lot> {
        &self.lots
    }

    pub fn is_flat(&self) -> bool {
        self.lots.is_empty()
    }

    /// Cost of the open position.
    pub fn open_cost_basis(&self) -> Micros {
        self.lots
            .iter()
            .fold(Notional::ZERO, |acc, l| acc + l.cost_basis())
            .to_micros()
    }

    /// Value of the open position at `mark`.
    pub fn market_value(&self, mark: Micros) -> Micros {
        Notional::of(self.open_quantity(), mark).to_micros()
    }

    /// Unrealized gain/loss of the open lots at `mark`.
    pub fn unrealized_gain_loss(&self, mark: Micros) -> Micros {
        self.lots
            .iter()
            .fold(Notional::ZERO, |acc, l| {
                acc + Notional::of(l.quantity, mark) - l.cost_basis()
            })
            .to_micros()
    }

    /// `true` when open quantity equals purchased minus matched quantity.
    ///
    /// Cheap (O(lots)); intended for tests and post-replay assertions.
    pub fn verify_integrity(&self) -> bool {
        let sorted = self
            .lots
            .iter()
            .zip(self.lots.iter().skip(1))
            .all(|(a, b)| a.timestamp <= b.timestamp);
        let positive = self.lots.iter().all(|l| l.quantity.is_positive());
        sorted
            && positive
            && self.open_quantity() == self.purchased.saturating_sub(self.matched)
    }
}

fn validate(quantity: Qty, unit_price: Micros) -> Result<(), LedgerError> {
    if !quantity.is_positive() {
        return Err(LedgerError::InvalidInput {
            field: "quantity",
            value: quantity.to_string(),
        });
    }
    if unit_price.is_negative() {
        return Err(LedgerError::InvalidInput {
            field: "unit_price",
            value: unit_price.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
