//! Per-feature and per-user command usage counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{update, RecordStore, StoreError};

/// Record holding the counters.
pub const USES_KEY: &str = "uses";

/// Counted features. Key names match existing `uses.json` files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageKind {
    Value,
    Trade,
    Investment,
    Tutorial,
}

impl UsageKind {
    pub fn key(self) -> &'static str {
        match self {
            UsageKind::Value => "total_uses",
            UsageKind::Trade => "trade_uses",
            UsageKind::Investment => "investement_uses",
            UsageKind::Tutorial => "tutorial_uses",
        }
    }
}

/// Flat map of feature totals and per-user counts keyed by user id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageCounters(BTreeMap<String, u64>);

impl UsageCounters {
    pub fn record(&mut self, kind: UsageKind, user_id: u64) {
        *self.0.entry(kind.key().to_string()).or_default() += 1;
        *self.0.entry(user_id.to_string()).or_default() += 1;
    }

    pub fn total(&self, kind: UsageKind) -> u64 {
        self.0.get(kind.key()).copied().unwrap_or(0)
    }

    /// Uses of any feature by `user_id`.
    pub fn user(&self, user_id: u64) -> u64 {
        self.0.get(&user_id.to_string()).copied().unwrap_or(0)
    }
}

/// Count one use and return the updated counters.
pub fn record_use<S: RecordStore + ?Sized>(
    store: &mut S,
    kind: UsageKind,
    user_id: u64,
) -> Result<UsageCounters, StoreError> {
    update(store, USES_KEY, |c: &mut UsageCounters| {
        c.record(kind, user_id);
        c.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{load, MemoryStore};
    use proptest::prelude::*;

    #[test]
    fn counts_per_feature_and_user() {
        let mut store = MemoryStore::new();
        record_use(&mut store, UsageKind::Value, 1).unwrap();
        record_use(&mut store, UsageKind::Trade, 1).unwrap();
        let c = record_use(&mut store, UsageKind::Value, 2).unwrap();
        assert_eq!(c.total(UsageKind::Value), 2);
        assert_eq!(c.total(UsageKind::Trade), 1);
        assert_eq!(c.total(UsageKind::Investment), 0);
        assert_eq!(c.user(1), 2);
        assert_eq!(c.user(3), 0);
        let stored: UsageCounters = load(&store, USES_KEY).unwrap().unwrap();
        assert_eq!(stored, c);
    }

    #[test]
    fn reads_legacy_layout() {
        let c: UsageCounters =
            serde_json::from_str(r#"{"total_uses": 10, "investement_uses": 2, "42": 7}"#).unwrap();
        assert_eq!(c.total(UsageKind::Investment), 2);
        assert_eq!(c.user(42), 7);
    }

    proptest! {
        #[test]
        fn feature_totals_sum_to_user_totals(uses in prop::collection::vec((0u64..5, 0usize..4), 0..50)) {
            let kinds = [UsageKind::Value, UsageKind::Trade, UsageKind::Investment, UsageKind::Tutorial];
            let mut c = UsageCounters::default();
            for &(user, k) in &uses {
                c.record(kinds[k], user);
            }
            let by_feature: u64 = kinds.iter().map(|&k| c.total(k)).sum();
            let by_user: u64 = (0..5).map(|u| c.user(u)).sum();
            prop_assert_eq!(by_feature, uses.len() as u64);
            prop_assert_eq!(by_user, uses.len() as u64);
        }
    }
}
