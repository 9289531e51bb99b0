//! Giveaway record: prize, deadline, target channel and entries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{draw, highest_weight_entry, DrawError, DrawSource, GiveawayEntry};

/// Chance earned per server invite.
pub const CHANCE_PER_INVITE: f64 = 3.0;
/// Chance earned per recorded bot use.
pub const CHANCE_PER_BOT_USE: f64 = 0.05;
/// Chance given to a forced winner, for display.
pub const FORCED_CHANCE: f64 = 100.0;

const MAX_DAYS: f64 = 365.0;

/// Parse `"<days>d"`, fractional days allowed, into a duration truncated
/// to whole seconds. Accepts up to a year.
pub fn parse_duration(text: &str) -> Result<Duration, DrawError> {
    let invalid = || DrawError::InvalidDuration(text.to_string());
    let normalized = text.trim().to_lowercase();
    let days: f64 = normalized
        .strip_suffix('d')
        .ok_or_else(invalid)?
        .trim()
        .parse()
        .map_err(|_| invalid())?;
    if !(days.is_finite() && days > 0.0 && days <= MAX_DAYS) {
        return Err(invalid());
    }
    Ok(Duration::seconds((days * 86_400.0) as i64))
}

/// Result of a join attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// Existing entry refreshed with the new counts.
    Updated,
    /// An administrator override holds the entry; nothing changed.
    Pinned,
}

/// Winner announcement data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawReport {
    pub prize: String,
    pub channel_id: u64,
    pub winner: GiveawayEntry,
    pub highest: GiveawayEntry,
    pub entry_count: usize,
}

/// A running giveaway. Destroyed by [`Giveaway::finish`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Giveaway {
    pub prize: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end_time: DateTime<Utc>,
    pub channel_id: u64,
    #[serde(default)]
    pub message_id: Option<u64>,
    #[serde(default)]
    pub entries: Vec<GiveawayEntry>,
}

impl Giveaway {
    pub fn create(
        prize: &str,
        duration: &str,
        channel_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, DrawError> {
        let end_time = now + parse_duration(duration)?;
        info!(prize, %end_time, channel_id, "giveaway created");
        Ok(Self {
            prize: prize.to_string(),
            end_time,
            channel_id,
            message_id: None,
            entries: Vec::new(),
        })
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Time left until the deadline, zero once due.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.end_time - now).max(Duration::zero())
    }

    pub fn entry(&self, user_id: u64) -> Option<&GiveawayEntry> {
        self.entries.iter().find(|e| e.user_id == user_id)
    }

    /// Enter `user_id` with a chance of `invites * 3 + bot_uses * 0.05`.
    /// Rejoining refreshes the entry in place unless it is pinned.
    pub fn join(&mut self, user_id: u64, invites: u64, bot_uses: u64) -> JoinOutcome {
        let chance = invites as f64 * CHANCE_PER_INVITE + bot_uses as f64 * CHANCE_PER_BOT_USE;
        match self.entries.iter_mut().find(|e| e.user_id == user_id) {
            Some(e) if e.pinned => JoinOutcome::Pinned,
            Some(e) => {
                e.invites = invites;
                e.bot_uses = bot_uses;
                e.chance = chance;
                JoinOutcome::Updated
            }
            None => {
                self.entries.push(GiveawayEntry {
                    user_id,
                    invites,
                    bot_uses,
                    chance,
                    forced: false,
                    pinned: false,
                });
                JoinOutcome::Joined
            }
        }
    }

    fn pin(&mut self, user_id: u64, chance: f64, forced: bool) {
        match self.entries.iter_mut().find(|e| e.user_id == user_id) {
            Some(e) => {
                e.chance = chance;
                e.forced = forced;
                e.pinned = true;
            }
            None => self.entries.push(GiveawayEntry {
                user_id,
                invites: 0,
                bot_uses: 0,
                chance,
                forced,
                pinned: true,
            }),
        }
    }

    /// Make `user_id` win regardless of weights.
    pub fn force_winner(&mut self, user_id: u64) {
        self.pin(user_id, FORCED_CHANCE, true);
    }

    /// Drop `user_id`'s chance to zero.
    pub fn blacklist(&mut self, user_id: u64) {
        self.pin(user_id, 0.0, false);
    }

    /// Draw the winner, consuming the giveaway.
    pub fn finish<S: DrawSource + ?Sized>(self, source: &mut S) -> Result<DrawReport, DrawError> {
        let winner = draw(&self.entries, source)?.clone();
        let highest = highest_weight_entry(&self.entries)
            .cloned()
            .unwrap_or_else(|| winner.clone());
        info!(prize = %self.prize, winner = winner.user_id, chance = winner.chance, "giveaway drawn");
        Ok(DrawReport {
            entry_count: self.entries.len(),
            prize: self.prize,
            channel_id: self.channel_id,
            winner,
            highest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedDraws, RngSource};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("1d").unwrap(), Duration::days(1));
        assert_eq!(parse_duration(" 1.5D ").unwrap(), Duration::hours(36));
        for bad in ["1h", "d", "-1d", "0d", "abcd", "nand", "1000d"] {
            assert_eq!(
                parse_duration(bad),
                Err(DrawError::InvalidDuration(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn deadline() {
        let g = Giveaway::create("Gold Kukri", "2d", 10, now()).unwrap();
        assert!(!g.is_due(now()));
        assert_eq!(g.remaining(now()), Duration::days(2));
        assert!(g.is_due(now() + Duration::days(2)));
        assert_eq!(g.remaining(now() + Duration::days(3)), Duration::zero());
    }

    #[test]
    fn join_computes_chance_and_never_duplicates() {
        let mut g = Giveaway::create("Hat", "1d", 1, now()).unwrap();
        assert_eq!(g.join(7, 2, 20), JoinOutcome::Joined);
        assert!((g.entry(7).unwrap().chance - 7.0).abs() < 1e-9);
        assert_eq!(g.join(7, 3, 0), JoinOutcome::Updated);
        assert_eq!(g.entries.len(), 1);
        assert!((g.entry(7).unwrap().chance - 9.0).abs() < 1e-9);
    }

    #[test]
    fn overrides_pin_entries() {
        let mut g = Giveaway::create("Hat", "1d", 1, now()).unwrap();
        g.join(1, 10, 0);
        g.blacklist(1);
        assert_eq!(g.join(1, 50, 50), JoinOutcome::Pinned);
        assert_eq!(g.entry(1).unwrap().chance, 0.0);
        g.force_winner(2);
        let e = g.entry(2).unwrap();
        assert!(e.forced && e.pinned);
        assert_eq!(e.chance, FORCED_CHANCE);
    }

    #[test]
    fn finish_reports_winner_and_highest() {
        let mut g = Giveaway::create("Hat", "1d", 99, now()).unwrap();
        g.join(1, 1, 0); // 3
        g.join(2, 0, 20); // 1
        let report = g.finish(&mut FixedDraws::new(vec![0.9])).unwrap();
        assert_eq!(report.winner.user_id, 2);
        assert_eq!(report.highest.user_id, 1);
        assert_eq!(report.entry_count, 2);
        assert_eq!(report.channel_id, 99);
    }

    #[test]
    fn forced_winner_beats_blacklist_of_everyone_else() {
        let mut g = Giveaway::create("Hat", "1d", 1, now()).unwrap();
        for u in 1..=5 {
            g.join(u, 5, 5);
        }
        g.blacklist(3);
        g.force_winner(4);
        let report = g.finish(&mut RngSource::seeded(1)).unwrap();
        assert_eq!(report.winner.user_id, 4);
    }

    #[test]
    fn empty_giveaway_has_no_winner() {
        let g = Giveaway::create("Hat", "1d", 1, now()).unwrap();
        assert_eq!(
            g.finish(&mut RngSource::seeded(1)),
            Err(DrawError::NoEntries)
        );
    }

    #[test]
    fn record_keeps_unix_end_time() {
        let g = Giveaway::create("Hat", "1d", 1, now()).unwrap();
        let v = serde_json::to_value(&g).unwrap();
        assert_eq!(v["end_time"], now().timestamp() + 86_400);
        let back: Giveaway = serde_json::from_value(v).unwrap();
        assert_eq!(back, g);
    }
}
