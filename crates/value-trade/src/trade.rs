//! Two-sided trade negotiation and settlement.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use value_core::{BotConfig, Catalog, ValuationPolicy, ValueError};

use crate::{TradeError, UserId};

/// Which half of the negotiation an addition goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// What the session owner gives.
    Offer,
    /// What the session owner receives.
    Counter,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeItemEntry {
    pub name: String,
    pub serial: Option<u64>,
    /// Serial was filled in with the high-serial sentinel.
    pub auto_serial: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSide {
    pub items: Vec<TradeItemEntry>,
    pub cash: u64,
}

/// One user's open negotiation. Only ever appended to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSession {
    pub offer: TradeSide,
    pub counter: TradeSide,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuedItem {
    pub entry: TradeItemEntry,
    /// Zero when the entry could not be valued.
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideTotal {
    pub items: Vec<ValuedItem>,
    pub cash: u64,
    pub total: u64,
}

/// Result of comparing the two side totals; the payload is the absolute difference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The offer side is worth more.
    FirstWins(u64),
    /// The counter side is worth more.
    SecondWins(u64),
    Tie,
}

impl Outcome {
    pub fn difference(self) -> u64 {
        match self {
            Outcome::FirstWins(d) | Outcome::SecondWins(d) => d,
            Outcome::Tie => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub offer: SideTotal,
    pub counter: SideTotal,
    pub outcome: Outcome,
}

impl TradeSide {
    fn valued(&self, catalog: &Catalog, policy: ValuationPolicy) -> SideTotal {
        let mut total = self.cash;
        let items = self
            .items
            .iter()
            .map(|entry| {
                let value = catalog
                    .value_of(&entry.name, entry.serial, policy)
                    .unwrap_or_else(|e| {
                        warn!(item = %entry.name, error = %e, "valuing trade entry as zero");
                        0
                    });
                total = total.saturating_add(value);
                ValuedItem {
                    entry: entry.clone(),
                    value,
                }
            })
            .collect();
        SideTotal {
            items,
            cash: self.cash,
            total,
        }
    }
}

impl TradeSession {
    pub fn side(&self, side: Side) -> &TradeSide {
        match side {
            Side::Offer => &self.offer,
            Side::Counter => &self.counter,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut TradeSide {
        match side {
            Side::Offer => &mut self.offer,
            Side::Counter => &mut self.counter,
        }
    }

    /// Value both sides and compare. Entries that fail to resolve count as 0.
    pub fn settle(self, catalog: &Catalog, policy: ValuationPolicy) -> Settlement {
        let offer = self.offer.valued(catalog, policy);
        let counter = self.counter.valued(catalog, policy);
        let outcome = match offer.total.cmp(&counter.total) {
            std::cmp::Ordering::Greater => Outcome::FirstWins(offer.total - counter.total),
            std::cmp::Ordering::Less => Outcome::SecondWins(counter.total - offer.total),
            std::cmp::Ordering::Equal => Outcome::Tie,
        };
        Settlement {
            offer,
            counter,
            outcome,
        }
    }
}

/// Open trade sessions, at most one per user.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TradeDesk {
    high_serial: u64,
    policy: ValuationPolicy,
    sessions: BTreeMap<UserId, TradeSession>,
}

impl TradeDesk {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            high_serial: config.high_serial,
            policy: config.settlement_policy(),
            sessions: BTreeMap::new(),
        }
    }

    /// Open an empty session, discarding any session the user already had.
    pub fn start(&mut self, user: UserId) -> &mut TradeSession {
        debug!(user, "trade session started");
        let session = self.sessions.entry(user).or_default();
        *session = TradeSession::default();
        session
    }

    pub fn session(&self, user: UserId) -> Option<&TradeSession> {
        self.sessions.get(&user)
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Append an item. Event and miscellaneous items reject serials;
    /// serial-bearing items default to the high-serial sentinel.
    pub fn add_item(
        &mut self,
        catalog: &Catalog,
        user: UserId,
        side: Side,
        name: &str,
        serial: Option<u64>,
    ) -> Result<&TradeItemEntry, TradeError> {
        let high_serial = self.high_serial;
        let session = self
            .sessions
            .get_mut(&user)
            .ok_or(TradeError::NoActiveSession)?;
        let category = catalog
            .category_of(name)
            .ok_or_else(|| ValueError::ItemNotFound(name.to_string()))?;
        let entry = match (category.takes_serial(), serial) {
            (false, Some(_)) => return Err(ValueError::SerialNotApplicable(name.to_string()).into()),
            (false, None) => TradeItemEntry {
                name: name.to_string(),
                serial: None,
                auto_serial: false,
            },
            (true, Some(serial)) => TradeItemEntry {
                name: name.to_string(),
                serial: Some(serial),
                auto_serial: false,
            },
            (true, None) => TradeItemEntry {
                name: name.to_string(),
                serial: Some(high_serial),
                auto_serial: true,
            },
        };
        let items = &mut session.side_mut(side).items;
        items.push(entry);
        Ok(&items[items.len() - 1])
    }

    /// Add cash to a side, returning the side's new cash total.
    pub fn add_cash(&mut self, user: UserId, side: Side, amount: u64) -> Result<u64, TradeError> {
        let session = self
            .sessions
            .get_mut(&user)
            .ok_or(TradeError::NoActiveSession)?;
        let side = session.side_mut(side);
        side.cash = side.cash.saturating_add(amount);
        Ok(side.cash)
    }

    /// Close the user's session and settle it.
    pub fn settle(&mut self, catalog: &Catalog, user: UserId) -> Result<Settlement, TradeError> {
        let session = self
            .sessions
            .remove(&user)
            .ok_or(TradeError::NoActiveSession)?;
        let settlement = session.settle(catalog, self.policy);
        debug!(user, outcome = ?settlement.outcome, "trade settled");
        Ok(settlement)
    }
}
