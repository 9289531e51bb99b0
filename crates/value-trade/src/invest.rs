//! Personal investment ledger: record purchases, compare them with current
//! catalog values and close them out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use value_core::{Catalog, ValuationPolicy};

use crate::{rounded_percent, TradeError};

/// Holdings shown by [`Portfolio::view`].
pub const VIEW_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    pub item: String,
    pub serial: u64,
    pub date: DateTime<Utc>,
    /// Purchase price.
    pub price: u64,
}

/// How a purchase price compares with the current value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Higher,
    Lower,
    Equal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddReceipt {
    pub purchase: u64,
    pub current_value: u64,
    pub direction: Direction,
    /// `|purchase - current| / current`, as a rounded percentage.
    pub percent: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleOutcome {
    Win,
    Lose,
    NoChange,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReport {
    pub sold: Investment,
    pub sell_value: u64,
    /// Signed change from the purchase price, rounded percentage.
    pub percent_change: i64,
    pub outcome: SaleOutcome,
    pub held_days: i64,
    /// Catalog value at the time of sale, 0 when it cannot be resolved.
    pub current_value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingView {
    pub item: String,
    /// `None` for items that are not told apart by serial.
    pub serial: Option<u64>,
    pub bought_for: u64,
    pub current_value: u64,
    pub percent_change: i64,
}

/// One user's investments, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portfolio {
    pub holdings: Vec<Investment>,
}

fn signed_diff(a: u64, b: u64) -> i64 {
    let d = i128::from(a) - i128::from(b);
    d.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

impl Portfolio {
    /// Record a purchase made at `now`.
    ///
    /// Fails with `DailyLimitReached` once `daily_limit` purchases share
    /// `now`'s UTC date, and with the catalog error when the item cannot be
    /// valued.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        catalog: &Catalog,
        policy: ValuationPolicy,
        daily_limit: usize,
        item: &str,
        serial: u64,
        price: u64,
        now: DateTime<Utc>,
    ) -> Result<AddReceipt, TradeError> {
        let today = now.date_naive();
        let today_count = self
            .holdings
            .iter()
            .filter(|h| h.date.date_naive() == today)
            .count();
        if today_count >= daily_limit {
            return Err(TradeError::DailyLimitReached(daily_limit));
        }
        let current_value = catalog.value_of(item, Some(serial), policy)?;
        let diff = signed_diff(price, current_value);
        let direction = match diff.signum() {
            1 => Direction::Higher,
            -1 => Direction::Lower,
            _ => Direction::Equal,
        };
        self.holdings.push(Investment {
            item: item.to_string(),
            serial,
            date: now,
            price,
        });
        debug!(item, serial, price, current_value, "investment recorded");
        Ok(AddReceipt {
            purchase: price,
            current_value,
            direction,
            percent: rounded_percent(diff.saturating_abs(), current_value),
        })
    }

    /// Positions of holdings matching `item` (ignoring case) and, when
    /// given, `serial`.
    pub fn matching(&self, item: &str, serial: Option<u64>) -> Vec<usize> {
        let wanted = item.to_lowercase();
        self.holdings
            .iter()
            .enumerate()
            .filter(|(_, h)| h.item.to_lowercase() == wanted)
            .filter(|(_, h)| serial.map_or(true, |s| h.serial == s))
            .map(|(i, _)| i)
            .collect()
    }

    /// Close the holding at `index`, at `sell_price` or else the current value.
    ///
    /// The holding stays in place if no sell value can be determined.
    pub fn sell(
        &mut self,
        catalog: &Catalog,
        policy: ValuationPolicy,
        index: usize,
        sell_price: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<SaleReport, TradeError> {
        let holding = self
            .holdings
            .get(index)
            .ok_or(TradeError::NoMatchingInvestment)?;
        let current = catalog.value_of(&holding.item, Some(holding.serial), policy);
        let sell_value = match (sell_price, &current) {
            (Some(price), _) => price,
            (None, Ok(value)) => *value,
            (None, Err(e)) => return Err(e.clone().into()),
        };
        let current_value = current.unwrap_or_else(|e| {
            warn!(item = %holding.item, error = %e, "current value unavailable");
            0
        });
        let diff = signed_diff(sell_value, holding.price);
        let percent_change = rounded_percent(diff, holding.price);
        let outcome = if holding.price == 0 || diff == 0 {
            SaleOutcome::NoChange
        } else if diff > 0 {
            SaleOutcome::Win
        } else {
            SaleOutcome::Lose
        };
        let held_days = (now - holding.date).num_days().max(1);
        let sold = self.holdings.remove(index);
        debug!(item = %sold.item, sell_value, ?outcome, "investment sold");
        Ok(SaleReport {
            sold,
            sell_value,
            percent_change,
            outcome,
            held_days,
            current_value,
        })
    }

    /// Up to [`VIEW_LIMIT`] holdings with their current values.
    pub fn view(&self, catalog: &Catalog, policy: ValuationPolicy) -> Vec<HoldingView> {
        self.holdings
            .iter()
            .take(VIEW_LIMIT)
            .map(|h| {
                let current_value = catalog
                    .value_of(&h.item, Some(h.serial), policy)
                    .unwrap_or(0);
                let serial = catalog
                    .category_of(&h.item)
                    .filter(|c| c.takes_serial())
                    .map(|_| h.serial);
                HoldingView {
                    item: h.item.clone(),
                    serial,
                    bought_for: h.price,
                    current_value,
                    percent_change: rounded_percent(
                        signed_diff(current_value, h.price),
                        h.price,
                    ),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use value_core::ValueError;

    const DOC: &str = r#"{
        "items": {"Gold Kukri": {"prices": [
            {"range": [1, 100], "price": "500k"},
            {"range": [101, 1000], "price": "200k"}
        ]}},
        "event_items": {"Pumpkin Hat": {"price": "2M"}}
    }"#;

    fn catalog() -> Catalog {
        Catalog::from_json_str(DOC).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    const P: ValuationPolicy = ValuationPolicy::SETTLEMENT;

    #[test]
    fn add_compares_with_current_value() {
        let c = catalog();
        let mut p = Portfolio::default();
        let r = p.add(&c, P, 3, "Gold Kukri", 50, 600_000, t0()).unwrap();
        assert_eq!(r.current_value, 500_000);
        assert_eq!(r.direction, Direction::Higher);
        assert_eq!(r.percent, 20);
        let r = p.add(&c, P, 3, "Gold Kukri", 500, 150_000, t0()).unwrap();
        assert_eq!(r.direction, Direction::Lower);
        assert_eq!(r.percent, 25);
        // out of range falls back to the last band
        let r = p.add(&c, P, 3, "Gold Kukri", 5000, 200_000, t0()).unwrap();
        assert_eq!(r.direction, Direction::Equal);
        assert_eq!(r.percent, 0);
    }

    #[test]
    fn daily_limit_resets_next_utc_day() {
        let c = catalog();
        let mut p = Portfolio::default();
        for _ in 0..3 {
            p.add(&c, P, 3, "Pumpkin Hat", 1, 1, t0()).unwrap();
        }
        assert_eq!(
            p.add(&c, P, 3, "Pumpkin Hat", 1, 1, t0()),
            Err(TradeError::DailyLimitReached(3))
        );
        p.add(&c, P, 3, "Pumpkin Hat", 1, 1, t0() + Duration::days(1))
            .unwrap();
        assert_eq!(p.holdings.len(), 4);
    }

    #[test]
    fn unknown_items_are_not_recorded() {
        let mut p = Portfolio::default();
        assert_eq!(
            p.add(&catalog(), P, 3, "Nope", 1, 1, t0()),
            Err(TradeError::Value(ValueError::ItemNotFound("Nope".into())))
        );
        assert!(p.holdings.is_empty());
    }

    #[test]
    fn matching_ignores_case_and_filters_serial() {
        let c = catalog();
        let mut p = Portfolio::default();
        p.add(&c, P, 5, "Gold Kukri", 50, 1, t0()).unwrap();
        p.add(&c, P, 5, "Pumpkin Hat", 1, 1, t0()).unwrap();
        p.add(&c, P, 5, "Gold Kukri", 500, 1, t0()).unwrap();
        assert_eq!(p.matching("gold kukri", None), vec![0, 2]);
        assert_eq!(p.matching("GOLD KUKRI", Some(500)), vec![2]);
        assert!(p.matching("Iron Sword", None).is_empty());
    }

    #[test]
    fn sell_reports_change_and_removes_holding() {
        let c = catalog();
        let mut p = Portfolio::default();
        p.add(&c, P, 3, "Gold Kukri", 50, 400_000, t0()).unwrap();
        let later = t0() + Duration::days(10) + Duration::hours(5);
        let s = p.sell(&c, P, 0, None, later).unwrap();
        assert_eq!(s.sell_value, 500_000);
        assert_eq!(s.percent_change, 25);
        assert_eq!(s.outcome, SaleOutcome::Win);
        assert_eq!(s.held_days, 10);
        assert_eq!(s.current_value, 500_000);
        assert!(p.holdings.is_empty());
    }

    #[test]
    fn sell_at_explicit_price_and_minimum_hold() {
        let c = catalog();
        let mut p = Portfolio::default();
        p.add(&c, P, 3, "Pumpkin Hat", 1, 2_000_000, t0()).unwrap();
        let s = p
            .sell(&c, P, 0, Some(1_500_000), t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(s.outcome, SaleOutcome::Lose);
        assert_eq!(s.percent_change, -25);
        assert_eq!(s.held_days, 1);
        assert_eq!(
            p.sell(&c, P, 0, None, t0()),
            Err(TradeError::NoMatchingInvestment)
        );
    }

    #[test]
    fn view_hides_serials_of_serialless_items() {
        let c = catalog();
        let mut p = Portfolio::default();
        p.add(&c, P, 9, "Gold Kukri", 50, 250_000, t0()).unwrap();
        p.add(&c, P, 9, "Pumpkin Hat", 1, 2_000_000, t0()).unwrap();
        let v = p.view(&c, P);
        assert_eq!(v[0].serial, Some(50));
        assert_eq!(v[0].percent_change, 100);
        assert_eq!(v[1].serial, None);
        assert_eq!(v[1].percent_change, 0);
    }

    #[test]
    fn portfolio_serializes_as_list() {
        let c = catalog();
        let mut p = Portfolio::default();
        p.add(&c, P, 3, "Pumpkin Hat", 1, 5, t0()).unwrap();
        let v = serde_json::to_value(&p).unwrap();
        assert!(v.is_array());
        assert_eq!(v[0]["item"], "Pumpkin Hat");
    }
}
