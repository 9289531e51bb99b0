//! Price tokens, serial bands and item valuation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cash::parse_amount;
use crate::ValueError;

/// A closed serial interval priced by a token such as `"500k"` or `"150-200k"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPriceBand {
    /// Interval bounds in either order.
    pub range: [u64; 2],
    /// Price token for serials inside the interval.
    pub price: String,
}

impl SerialPriceBand {
    /// Bounds normalized to `(low, high)`.
    pub fn bounds(&self) -> (u64, u64) {
        let [a, b] = self.range;
        (a.min(b), a.max(b))
    }

    pub fn contains(&self, serial: u64) -> bool {
        let (low, high) = self.bounds();
        (low..=high).contains(&serial)
    }
}

fn unknown_label() -> String {
    "Unknown".to_string()
}

/// Catalog entry for one item, as stored in the values document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Flat price token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Serial bands, consulted in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prices: Option<Vec<SerialPriceBand>>,
    #[serde(default = "unknown_label")]
    pub demand: String,
    #[serde(default = "unknown_label")]
    pub stability: String,
}

/// Borrowed view of whichever price information an item carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceTable<'a> {
    Flat(&'a str),
    Bands(&'a [SerialPriceBand]),
}

impl ItemDefinition {
    /// Price table of the item. Non-empty bands win over a flat price.
    pub fn price_table(&self) -> Option<PriceTable<'_>> {
        match (&self.prices, &self.price) {
            (Some(bands), _) if !bands.is_empty() => Some(PriceTable::Bands(bands)),
            (_, Some(flat)) => Some(PriceTable::Flat(flat)),
            _ => None,
        }
    }
}

/// What to do when a banded item is valued without a serial.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSerial {
    /// Fail with `SerialRequired`.
    #[default]
    Require,
    /// Quote the first band as the high-serial representative value.
    FirstBand,
}

/// What to do when no band contains the serial.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBand {
    /// Quote the last declared band.
    #[default]
    LastBand,
    /// Fail with `SerialOutOfRange`.
    Fail,
}

/// Resolution policy for banded items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationPolicy {
    pub missing_serial: MissingSerial,
    pub missing_band: MissingBand,
}

impl ValuationPolicy {
    /// Value lookups: no serial quotes the first band, an unmatched serial fails.
    pub const LOOKUP: Self = Self {
        missing_serial: MissingSerial::FirstBand,
        missing_band: MissingBand::Fail,
    };

    /// Trades and investments: a serial is required, an unmatched serial
    /// falls back to the last band.
    pub const SETTLEMENT: Self = Self {
        missing_serial: MissingSerial::Require,
        missing_band: MissingBand::LastBand,
    };
}

/// Quoted value of an item together with its display labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueResult {
    pub amount: u64,
    pub demand: String,
    pub stability: String,
    /// Set when no serial was given and the first band stood in for it.
    pub is_high_serial_default: bool,
}

fn has_unit(token: &str) -> Option<char> {
    token
        .chars()
        .last()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| matches!(c, 'k' | 'm'))
}

/// Resolve a price token to an amount.
///
/// `"150k-200k"` is the floor of the mean of both halves. A unit on the
/// upper half carries over to a bare lower half, so `"150-200k"` is read
/// as `"150k-200k"`.
pub fn resolve_price_token(token: &str) -> Result<u64, ValueError> {
    if !token.contains('-') {
        return parse_amount(token);
    }
    let parts: Vec<&str> = token.split('-').map(str::trim).collect();
    let [first, second] = parts.as_slice() else {
        return Err(ValueError::InvalidPriceRange(token.to_string()));
    };
    let low = match (has_unit(first), has_unit(second)) {
        (None, Some(unit)) => parse_amount(&format!("{first}{unit}"))?,
        _ => parse_amount(first)?,
    };
    let high = parse_amount(second)?;
    Ok(low / 2 + high / 2 + (low % 2 + high % 2) / 2)
}

/// Value `item` (named `name` for error reporting) at an optional serial.
pub fn resolve_item_value(
    name: &str,
    item: &ItemDefinition,
    serial: Option<u64>,
    policy: ValuationPolicy,
) -> Result<ValueResult, ValueError> {
    let table = item
        .price_table()
        .ok_or_else(|| ValueError::ItemNotFound(name.to_string()))?;
    let (token, is_high_serial_default) = match (table, serial) {
        (PriceTable::Flat(token), _) => (token, false),
        (PriceTable::Bands(bands), None) => match policy.missing_serial {
            MissingSerial::Require => return Err(ValueError::SerialRequired(name.to_string())),
            MissingSerial::FirstBand => (bands[0].price.as_str(), true),
        },
        (PriceTable::Bands(bands), Some(serial)) => {
            match bands.iter().find(|band| band.contains(serial)) {
                Some(band) => (band.price.as_str(), false),
                None => match (policy.missing_band, bands.last()) {
                    (MissingBand::LastBand, Some(last)) => {
                        debug!(item = name, serial, "no band matched; using last band");
                        (last.price.as_str(), false)
                    }
                    _ => {
                        return Err(ValueError::SerialOutOfRange {
                            item: name.to_string(),
                            serial,
                        })
                    }
                },
            }
        }
    };
    Ok(ValueResult {
        amount: resolve_price_token(token)?,
        demand: item.demand.clone(),
        stability: item.stability.clone(),
        is_high_serial_default,
    })
}
