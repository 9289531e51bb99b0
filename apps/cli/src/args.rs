//! Command-line surface.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use value_core::parse_amount;

#[derive(Parser, Debug)]
#[command(name = "trade-values")]
#[command(about = "Item values, trade settlement, investments and giveaways")]
#[command(version)]
pub struct Cli {
    /// YAML configuration; built-in defaults when absent
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Item catalog document
    #[arg(long, global = true, default_value = "assets/values.json")]
    pub catalog: PathBuf,

    /// Directory holding the JSON records
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Acting user id
    #[arg(long, global = true, default_value_t = 0)]
    pub user: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up an item's value
    Value {
        /// Exact item name, e.g. "Gold Kukri"
        name: String,
        /// Serial number; auction items only
        serial: Option<u64>,
    },

    /// List item names containing the text
    Suggest { query: String },

    /// Check every catalog price
    Validate,

    /// Settle a trade between what you give and what you receive
    Trade {
        /// Given away: cash=<amount> or item=<name>[#serial]
        #[arg(long, value_parser = parse_trade_entry)]
        offer: Vec<TradeEntry>,

        /// Received: cash=<amount> or item=<name>[#serial]
        #[arg(long, value_parser = parse_trade_entry)]
        counter: Vec<TradeEntry>,
    },

    /// Personal investment ledger
    #[command(subcommand)]
    Invest(InvestCommand),

    /// The running giveaway
    #[command(subcommand)]
    Giveaway(GiveawayCommand),

    /// Walk-through of a feature
    Tutorial {
        #[arg(value_enum)]
        topic: Topic,
    },

    /// Usage counters
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum InvestCommand {
    /// Record a purchase
    Add {
        #[arg(long)]
        item: String,
        #[arg(long)]
        serial: u64,
        /// Purchase price, e.g. 600k
        #[arg(long, value_parser = parse_amount)]
        price: u64,
    },

    /// Close a holding at a price, or at the current value
    Sell {
        #[arg(long)]
        item: String,
        #[arg(long)]
        serial: Option<u64>,
        #[arg(long, value_parser = parse_amount)]
        price: Option<u64>,
        /// 1-based choice when several holdings match
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Holdings with their current values
    View,
}

#[derive(Subcommand, Debug)]
pub enum GiveawayCommand {
    /// Start a giveaway, replacing any running one
    Create {
        prize: String,
        /// Length in days, e.g. 2d or 0.5d
        duration: String,
        channel_id: u64,
    },

    /// Enter, or refresh your entry
    Join { invites: u64 },

    /// Make a user win regardless of chances
    Force { user_id: u64 },

    /// Drop a user's chance to zero
    Blacklist { user_id: u64 },

    /// Draw the winner once the giveaway is due
    Draw {
        /// Draw even if the deadline has not passed
        #[arg(long)]
        now: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Topic {
    Trading,
    Investments,
    Values,
}

/// One addition to a trade side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TradeEntry {
    Cash(u64),
    Item { name: String, serial: Option<u64> },
}

pub fn parse_trade_entry(text: &str) -> Result<TradeEntry, String> {
    match text.split_once('=') {
        Some(("cash", amount)) => parse_amount(amount)
            .map(TradeEntry::Cash)
            .map_err(|e| e.to_string()),
        Some(("item", item)) => {
            let (name, serial) = match item.rsplit_once('#') {
                Some((name, serial)) => {
                    let serial = serial
                        .trim()
                        .parse()
                        .map_err(|_| format!("invalid serial {serial:?}"))?;
                    (name, Some(serial))
                }
                None => (item, None),
            };
            Ok(TradeEntry::Item {
                name: name.trim().to_string(),
                serial,
            })
        }
        _ => Err(format!(
            "expected cash=<amount> or item=<name>[#serial], got {text:?}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_entries() {
        assert_eq!(parse_trade_entry("cash=2.5M"), Ok(TradeEntry::Cash(2_500_000)));
        assert_eq!(
            parse_trade_entry("item=Gold Kukri#37"),
            Ok(TradeEntry::Item {
                name: "Gold Kukri".into(),
                serial: Some(37)
            })
        );
        assert_eq!(
            parse_trade_entry("item=Snow Globe"),
            Ok(TradeEntry::Item {
                name: "Snow Globe".into(),
                serial: None
            })
        );
        for bad in ["gems=3", "cash=lots", "item=Gold Kukri#x", "Gold Kukri"] {
            assert!(parse_trade_entry(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["trade-values", "stats", "--user", "9"]).unwrap();
        assert_eq!(cli.user, 9);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn invest_price_uses_cash_syntax() {
        let cli = Cli::try_parse_from([
            "trade-values", "invest", "add", "--item", "Iron Sword", "--serial", "1", "--price",
            "60k",
        ])
        .unwrap();
        match cli.command {
            Commands::Invest(InvestCommand::Add { price, .. }) => assert_eq!(price, 60_000),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from([
            "trade-values", "invest", "add", "--item", "Iron Sword", "--serial", "1", "--price",
            "sixty",
        ])
        .is_err());
    }
}
