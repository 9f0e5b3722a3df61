//! tmk-ledger
//!
//! FIFO cost-basis accounting for token-market assets.
//! - One ledger per asset; lots consumed strictly oldest-first
//! - Realized gain/loss and percent change over consumed cost
//! - Exact scaled-integer arithmetic (no floats anywhere)
//! - Rebuild from raw transaction history with explicit coercion policy
//! - Pure deterministic logic (no IO, no clock)

mod fixedpoint;
mod types;

pub mod book;
pub mod history;
pub mod ledger;
pub mod present;

pub use book::LedgerBook;
pub use fixedpoint::{Micros, Notional, ParseFixedError, Percent, Qty, MICROS_SCALE, QTY_SCALE};
pub use history::{
    build_ledger, sort_for_replay, CoercionPolicy, HistoryError, RawDecimal, Replay,
    ReplayOptions, ReplayReport, TxKind, TxRecord, UnknownPolicy,
};
pub use ledger::{FifoLedger, LedgerError};
pub use present::{format_currency, format_percent, format_qty};
pub use types::{Lot, LotMatch, OversellPolicy, SaleOutcome, Summary};
