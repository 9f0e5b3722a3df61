use chrono::{DateTime, Utc};

use crate::fixedpoint::{Micros, Notional, Percent, Qty};

/// An open (or partially consumed) purchase.
///
/// `quantity` is what remains unconsumed; a lot whose quantity reaches
/// zero is removed from its ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lot {
    pub quantity: Qty,
    pub unit_price: Micros,
    /// Acquisition time. Used only for ordering.
    pub timestamp: DateTime<Utc>,
}

impl Lot {
    pub fn new(quantity: Qty, unit_price: Micros, timestamp: DateTime<Utc>) -> Self {
        debug_assert!(quantity.is_positive(), "Lot.quantity must be > 0");
        Self {
            quantity,
            unit_price,
            timestamp,
        }
    }

    /// Cost of the units still open in this lot.
    pub fn cost_basis(&self) -> Notional {
        Notional::of(self.quantity, self.unit_price)
    }
}

/// What to do with the part of a sale that exceeds the open quantity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OversellPolicy {
    /// Match what is available and drop the remainder. The dropped
    /// quantity is reported in [`SaleOutcome::clipped`].
    #[default]
    Clip,
    /// Refuse the whole sale with `InsufficientLots`.
    Reject,
}

impl OversellPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OversellPolicy::Clip => "clip",
            OversellPolicy::Reject => "reject",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clip" => Some(OversellPolicy::Clip),
            "reject" => Some(OversellPolicy::Reject),
            _ => None,
        }
    }
}

/// One slice of a sale matched against one lot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotMatch {
    /// Timestamp of the lot the units came from.
    pub lot_timestamp: DateTime<Utc>,
    pub quantity: Qty,
    pub unit_cost: Micros,
    pub cost_basis: Notional,
    pub proceeds: Notional,
    pub gain_loss: Notional,
}

/// Result of a single `record_sale`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleOutcome {
    pub sold_at: DateTime<Utc>,
    pub requested: Qty,
    /// Quantity matched against open lots.
    pub matched: Qty,
    /// Quantity dropped because no open lot was left to charge it against.
    pub clipped: Qty,
    pub cost_basis: Notional,
    pub proceeds: Notional,
    pub gain_loss: Notional,
    /// Per-lot matches, oldest lot first.
    pub matches: Vec<LotMatch>,
}

impl SaleOutcome {
    pub fn was_clipped(&self) -> bool {
        self.clipped.is_positive()
    }
}

/// Exact running totals over every sale since construction or reset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RealizedTotals {
    pub gain_loss: Notional,
    pub cost_basis: Notional,
    pub proceeds: Notional,
}

/// Realized performance of a ledger, rounded for consumption.
///
/// `percent_change` is `gain_loss / cost_basis × 100`, or zero when no
/// cost has been consumed yet. It covers realized trades only.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_gain_loss: Micros,
    pub percent_change: Percent,
    pub cost_basis: Micros,
    pub proceeds: Micros,
}

impl From<RealizedTotals> for Summary {
    fn from(t: RealizedTotals) -> Self {
        Summary {
            total_gain_loss: t.gain_loss.to_micros(),
            percent_change: t.gain_loss.percent_of(t.cost_basis),
            cost_basis: t.cost_basis.to_micros(),
            proceeds: t.proceeds.to_micros(),
        }
    }
}
