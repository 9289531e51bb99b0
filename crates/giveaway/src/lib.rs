#![deny(warnings)]

//! Weighted giveaway draws.
//!
//! Entries carry a non-negative `chance` weight. A forced entry wins
//! outright; otherwise one uniform sample over the summed weights is walked
//! through the entries in order. Randomness comes from a [`DrawSource`] so
//! draws are reproducible under a seed or a fixed sequence.

pub mod record;

pub use record::{parse_duration, DrawReport, Giveaway, JoinOutcome};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by giveaway operations.
#[derive(Debug, Error, PartialEq)]
pub enum DrawError {
    #[error("no entries were recorded")]
    NoEntries,
    /// Every entry has zero chance.
    #[error("no entry has a positive chance")]
    NoEligibleEntries,
    #[error("entry {user_id} has invalid chance {chance}")]
    InvalidChance { user_id: u64, chance: f64 },
    #[error("invalid duration {0:?}; use days, e.g. 1d")]
    InvalidDuration(String),
}

/// One participant of a giveaway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GiveawayEntry {
    pub user_id: u64,
    #[serde(default)]
    pub invites: u64,
    #[serde(default)]
    pub bot_uses: u64,
    /// Relative win weight (>= 0).
    pub chance: f64,
    #[serde(default)]
    pub forced: bool,
    /// Set by an administrator override; joins no longer change the entry.
    #[serde(default)]
    pub pinned: bool,
}

/// Source of uniform samples for a draw.
pub trait DrawSource {
    /// A sample in `[0, upper)`.
    fn uniform(&mut self, upper: f64) -> f64;
}

/// Adapts any `rand` generator.
#[derive(Clone, Debug)]
pub struct RngSource<R>(pub R);

impl<R: Rng> DrawSource for RngSource<R> {
    fn uniform(&mut self, upper: f64) -> f64 {
        self.0.gen::<f64>() * upper
    }
}

impl RngSource<ChaCha8Rng> {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(ChaCha8Rng::from_entropy())
    }

    /// Seeded when `seed` is given, OS entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

/// Replays fixed fractions of the range, cycling when exhausted.
#[derive(Clone, Debug, Default)]
pub struct FixedDraws {
    fractions: Vec<f64>,
    next: usize,
}

impl FixedDraws {
    /// `fractions` are clamped into `[0, 1)`.
    pub fn new(fractions: Vec<f64>) -> Self {
        let fractions = fractions
            .into_iter()
            .map(|f| f.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { fractions, next: 0 }
    }
}

impl DrawSource for FixedDraws {
    fn uniform(&mut self, upper: f64) -> f64 {
        if self.fractions.is_empty() {
            return 0.0;
        }
        let f = self.fractions[self.next % self.fractions.len()];
        self.next += 1;
        f * upper
    }
}

/// Pick a winner.
///
/// The first forced entry wins regardless of weights. Otherwise a sample
/// `r` in `[0, total)` selects the first positive-weight entry whose running
/// weight sum reaches `r`.
pub fn draw<'a, S: DrawSource + ?Sized>(
    entries: &'a [GiveawayEntry],
    source: &mut S,
) -> Result<&'a GiveawayEntry, DrawError> {
    if entries.is_empty() {
        return Err(DrawError::NoEntries);
    }
    if let Some(forced) = entries.iter().find(|e| e.forced) {
        return Ok(forced);
    }
    let mut total = 0.0;
    for e in entries {
        if !(e.chance.is_finite() && e.chance >= 0.0) {
            return Err(DrawError::InvalidChance {
                user_id: e.user_id,
                chance: e.chance,
            });
        }
        total += e.chance;
    }
    if total <= 0.0 {
        return Err(DrawError::NoEligibleEntries);
    }
    let r = source.uniform(total);
    let mut running = 0.0;
    let mut last = None;
    for e in entries.iter().filter(|e| e.chance > 0.0) {
        running += e.chance;
        last = Some(e);
        if running >= r {
            return Ok(e);
        }
    }
    // float drift can leave the sum just short of r
    last.ok_or(DrawError::NoEligibleEntries)
}

/// Entry with the largest chance, first one on ties. Reporting only.
pub fn highest_weight_entry(entries: &[GiveawayEntry]) -> Option<&GiveawayEntry> {
    entries.iter().fold(None, |best, e| match best {
        Some(b) if b.chance >= e.chance => Some(b),
        _ => Some(e),
    })
}
