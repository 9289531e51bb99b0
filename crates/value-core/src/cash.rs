//! Cash amounts as typed by traders ("200k", "2.5M", "150").

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::ValueError;

static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+(?:\.[0-9]+)?)([km]?)$").expect("amount pattern compiles"));

/// Parse a cash token into whole currency units.
///
/// Input is trimmed and lowercased, `k` multiplies by 1,000 and `m` by
/// 1,000,000. Fractions are evaluated exactly and then truncated, so
/// `"2.3k"` is 2300 and `"1.5"` is 1.
pub fn parse_amount(text: &str) -> Result<u64, ValueError> {
    let invalid = || ValueError::InvalidAmountFormat(text.to_string());
    let normalized = text.trim().to_lowercase();
    let caps = AMOUNT.captures(&normalized).ok_or_else(invalid)?;
    let number = Decimal::from_str(&caps[1]).map_err(|_| invalid())?;
    let scaled = match &caps[2] {
        "k" => number.checked_mul(Decimal::from(1_000u32)),
        "m" => number.checked_mul(Decimal::from(1_000_000u32)),
        _ => Some(number),
    }
    .ok_or_else(invalid)?;
    scaled.trunc().to_u64().ok_or_else(invalid)
}

/// Render an amount for display.
///
/// Millions keep one decimal with a trailing `.0` dropped, thousands are
/// shown whole. Rounding follows the binary value of the quotient, so
/// 1,050,000 renders as "1.1M" and 1,150,000 as "1.1M". Lossy by intent:
/// 1,234,567 renders as "1.2M".
pub fn format_amount(amount: u64) -> String {
    if amount >= 1_000_000 {
        let millions = format!("{:.1}", amount as f64 / 1e6);
        let trimmed = millions.strip_suffix(".0").unwrap_or(&millions);
        format!("{trimmed}M")
    } else if amount >= 1_000 {
        format!("{:.0}k", amount as f64 / 1e3)
    } else {
        amount.to_string()
    }
}
