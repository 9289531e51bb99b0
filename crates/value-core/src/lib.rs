#![deny(warnings)]

//! Core valuation model for the trading bot.
//!
//! This crate owns the pieces every command relies on:
//! - cash amount parsing and display (`cash`)
//! - price tokens, serial bands and valuation policies (`pricing`)
//! - the grouped item catalog and its lookups (`catalog`)
//! - bot-wide tunables loaded from YAML (`config`)
//!
//! Everything here is synchronous and works on plain values; storage and
//! chat-platform concerns live elsewhere.

pub mod cash;
pub mod catalog;
pub mod config;
pub mod pricing;

pub use cash::{format_amount, parse_amount};
pub use catalog::{validate_catalog, Catalog, Category};
pub use config::BotConfig;
pub use pricing::{
    resolve_item_value, resolve_price_token, ItemDefinition, MissingBand, MissingSerial,
    PriceTable, SerialPriceBand, ValuationPolicy, ValueResult,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Serial assumed when a trader leaves it out for a serial-bearing item.
pub const HIGH_SERIAL: u64 = 75_000;

/// Default cap on autocomplete suggestions.
pub const SUGGESTION_LIMIT: usize = 25;

/// Serials below this are reported as low serials.
pub const LOW_SERIAL_THRESHOLD: u64 = 100;

/// Serials that collectors pay extra for regardless of their digits.
pub const SPECIAL_SERIALS: [u64; 7] = [69, 420, 6969, 42069, 69420, 420420, 696969];

/// Validation and lookup failures of the valuation core.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValueError {
    /// Text is not `<number>[k|m]`.
    #[error("invalid cash amount {0:?}; use e.g. 200k or 2M")]
    InvalidAmountFormat(String),
    /// A dashed price token did not split into exactly two halves.
    #[error("invalid price range {0:?}")]
    InvalidPriceRange(String),
    /// Unknown item, or an item without any price information.
    #[error("item not found: {0}")]
    ItemNotFound(String),
    /// The item is priced per serial and the caller gave none.
    #[error("a serial number must be provided for {0}")]
    SerialRequired(String),
    /// No band of the item contains the serial.
    #[error("serial {serial} is out of range for {item}")]
    SerialOutOfRange { item: String, serial: u64 },
    /// Event and miscellaneous items carry no serial.
    #[error("serials are not applicable to {0}")]
    SerialNotApplicable(String),
    /// Catalog entry declares both a flat price and serial bands.
    #[error("{0} declares both a flat price and serial bands")]
    AmbiguousPrice(String),
    /// Catalog document could not be decoded.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    /// Configuration document could not be decoded or is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Display hint attached to a quoted serial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerialNote {
    /// Memorable number: fixed set, round number or repdigit.
    Special,
    /// Below the low-serial threshold.
    Low,
}

impl SerialNote {
    pub fn message(self) -> &'static str {
        match self {
            SerialNote::Special => "This is a special serial and may receive overpays!",
            SerialNote::Low => "This is a low serial and may receive overpays!",
        }
    }
}

/// Classify a serial for display. Special takes precedence over low.
pub fn classify_serial(serial: u64, low_threshold: u64) -> Option<SerialNote> {
    let digits = serial.to_string();
    let bytes = digits.as_bytes();
    let round = bytes.len() > 1 && bytes[1..].iter().all(|&b| b == b'0');
    let repdigit = bytes.iter().all(|&b| b == bytes[0]);
    if SPECIAL_SERIALS.contains(&serial) || round || repdigit {
        return Some(SerialNote::Special);
    }
    if serial < low_threshold {
        return Some(SerialNote::Low);
    }
    None
}
