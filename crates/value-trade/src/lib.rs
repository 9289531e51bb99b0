#![deny(warnings)]

//! Trade settlement and investment tracking on top of the value catalog.
//!
//! - `trade`: per-user negotiation sessions with an offer and a counter side,
//!   settled by comparing aggregated values
//! - `invest`: a personal ledger of purchases compared against current values

pub mod invest;
pub mod trade;

pub use invest::{AddReceipt, Direction, HoldingView, Investment, Portfolio, SaleOutcome, SaleReport};
pub use trade::{
    Outcome, Settlement, Side, SideTotal, TradeDesk, TradeItemEntry, TradeSession, TradeSide,
    ValuedItem,
};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use value_core::ValueError;

/// Chat-platform user identifier.
pub type UserId = u64;

/// Errors produced by trade and investment operations.
#[derive(Debug, Error, PartialEq)]
pub enum TradeError {
    /// The user has no open trade session.
    #[error("no active trade session found")]
    NoActiveSession,
    /// Lookup or validation failure from the value core.
    #[error(transparent)]
    Value(#[from] ValueError),
    /// The per-day investment cap was hit.
    #[error("at most {0} investments may be added per day")]
    DailyLimitReached(usize),
    /// No holding at the requested position.
    #[error("no matching investment found")]
    NoMatchingInvestment,
}

/// `part / whole * 100` rounded half-to-even; 0 when `whole` is 0.
pub fn rounded_percent(part: i64, whole: u64) -> i64 {
    if whole == 0 {
        return 0;
    }
    let pct = Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole);
    let rounded = pct.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    rounded.to_i64().unwrap_or(0)
}
