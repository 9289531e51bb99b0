//! Subcommand implementations. Each returns the text to print.

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Utc};
use giveaway::{DrawError, Giveaway, JoinOutcome, RngSource};
use persistence::{load, record_use, save, RecordStore, UsageCounters, UsageKind, USES_KEY};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::{debug, info};
use value_core::{
    classify_serial, format_amount, validate_catalog, BotConfig, Catalog, ValuationPolicy,
    ValueError,
};
use value_trade::invest::VIEW_LIMIT;
use value_trade::{Direction, Outcome, Portfolio, SaleOutcome, Side, SideTotal, TradeDesk};

use crate::args::{Commands, GiveawayCommand, InvestCommand, Topic, TradeEntry};

const INVESTMENTS_KEY: &str = "investments";
const GIVEAWAY_KEY: &str = "giveaway";

/// Portfolios keyed by user id.
type Ledger = BTreeMap<String, Portfolio>;

pub struct Context<S: RecordStore> {
    pub config: BotConfig,
    pub catalog: Catalog,
    pub store: S,
    pub user: u64,
    pub now: DateTime<Utc>,
}

pub fn run<S: RecordStore>(ctx: &mut Context<S>, command: Commands) -> Result<String> {
    debug!(?command, user = ctx.user, "dispatch");
    match command {
        Commands::Value { name, serial } => value(ctx, &name, serial),
        Commands::Suggest { query } => suggest(ctx, &query),
        Commands::Validate => validate(ctx),
        Commands::Trade { offer, counter } => trade(ctx, offer, counter),
        Commands::Invest(cmd) => invest(ctx, cmd),
        Commands::Giveaway(cmd) => giveaway(ctx, cmd),
        Commands::Tutorial { topic } => tutorial(ctx, topic),
        Commands::Stats => stats(ctx),
    }
}

fn value<S: RecordStore>(ctx: &mut Context<S>, name: &str, serial: Option<u64>) -> Result<String> {
    let category = ctx
        .catalog
        .category_of(name)
        .ok_or_else(|| ValueError::ItemNotFound(name.to_string()))?;
    if serial.is_some() && !category.takes_serial() {
        return Err(ValueError::SerialNotApplicable(name.to_string()).into());
    }
    let result = ctx.catalog.appraise(name, serial, ValuationPolicy::LOOKUP)?;
    record_use(&mut ctx.store, UsageKind::Value, ctx.user)?;

    let mut out = String::new();
    match (category.takes_serial(), serial) {
        (true, Some(s)) => writeln!(out, "{name} - #{s}")?,
        (true, None) => writeln!(out, "{name} - High serial")?,
        (false, _) => writeln!(out, "{name}")?,
    }
    writeln!(out, "Value: {}", format_amount(result.amount))?;
    writeln!(out, "Demand: {}", result.demand)?;
    write!(out, "Stability: {}", result.stability)?;
    let note = serial.and_then(|s| classify_serial(s, ctx.config.low_serial_threshold));
    if result.is_high_serial_default {
        write!(out, "\nNo serial given; showing the first price band.")?;
    } else if let Some(note) = note {
        write!(out, "\n{}", note.message())?;
    }
    Ok(out)
}

fn suggest<S: RecordStore>(ctx: &mut Context<S>, query: &str) -> Result<String> {
    let names = ctx.catalog.suggest(query, ctx.config.suggestion_limit);
    if names.is_empty() {
        return Ok(format!("no items match {query:?}"));
    }
    Ok(names.join("\n"))
}

fn validate<S: RecordStore>(ctx: &mut Context<S>) -> Result<String> {
    validate_catalog(&ctx.catalog)?;
    Ok(format!("catalog OK: {} items", ctx.catalog.len()))
}

fn render_side(out: &mut String, title: &str, side: &SideTotal) -> std::fmt::Result {
    writeln!(out, "{title}:")?;
    for item in &side.items {
        match (item.entry.serial, item.entry.auto_serial) {
            (Some(_), true) => write!(out, "  - {} (high serial)", item.entry.name)?,
            (Some(s), false) => write!(out, "  - {} #{s}", item.entry.name)?,
            (None, _) => write!(out, "  - {}", item.entry.name)?,
        }
        writeln!(out, " (value: {})", format_amount(item.value))?;
    }
    if side.cash > 0 {
        writeln!(out, "  - Cash: {}", format_amount(side.cash))?;
    }
    writeln!(out, "  Total: {}", format_amount(side.total))
}

fn trade<S: RecordStore>(
    ctx: &mut Context<S>,
    offer: Vec<TradeEntry>,
    counter: Vec<TradeEntry>,
) -> Result<String> {
    let user = ctx.user;
    let mut desk = TradeDesk::new(&ctx.config);
    desk.start(user);
    let sides = offer
        .into_iter()
        .map(|e| (Side::Offer, e))
        .chain(counter.into_iter().map(|e| (Side::Counter, e)));
    for (side, entry) in sides {
        match entry {
            TradeEntry::Cash(amount) => {
                desk.add_cash(user, side, amount)?;
            }
            TradeEntry::Item { name, serial } => {
                desk.add_item(&ctx.catalog, user, side, &name, serial)?;
            }
        }
    }
    let settlement = desk.settle(&ctx.catalog, user)?;
    record_use(&mut ctx.store, UsageKind::Trade, user)?;

    let mut out = String::new();
    render_side(&mut out, "Your offer", &settlement.offer)?;
    render_side(&mut out, "Their offer", &settlement.counter)?;
    match settlement.outcome {
        Outcome::SecondWins(d) => write!(out, "Result: Win by {}", format_amount(d))?,
        Outcome::FirstWins(d) => write!(out, "Result: Lose by {}", format_amount(d))?,
        Outcome::Tie => write!(out, "Result: Tie - both offers are equal")?,
    }
    Ok(out)
}

fn invest<S: RecordStore>(ctx: &mut Context<S>, cmd: InvestCommand) -> Result<String> {
    // A ledger that fails to decode aborts here, before anything is written back.
    let mut ledger: Ledger = load(&ctx.store, INVESTMENTS_KEY)?.unwrap_or_default();
    let policy = ctx.config.settlement_policy();
    let portfolio = ledger.entry(ctx.user.to_string()).or_default();

    let out = match cmd {
        InvestCommand::Add {
            item,
            serial,
            price,
        } => {
            let receipt = portfolio.add(
                &ctx.catalog,
                policy,
                ctx.config.daily_investment_limit,
                &item,
                serial,
                price,
                ctx.now,
            )?;
            let (sign, word) = match receipt.direction {
                Direction::Higher => ("+", "higher"),
                Direction::Lower => ("-", "lower"),
                Direction::Equal => ("", "equal"),
            };
            let out = format!(
                "Added {item} #{serial} for {}. This is {sign}{}% {word} compared to the current value of {}.",
                format_amount(receipt.purchase),
                receipt.percent,
                format_amount(receipt.current_value),
            );
            save(&mut ctx.store, INVESTMENTS_KEY, &ledger)?;
            record_use(&mut ctx.store, UsageKind::Investment, ctx.user)?;
            out
        }
        InvestCommand::Sell {
            item,
            serial,
            price,
            pick,
        } => {
            let matches = portfolio.matching(&item, serial);
            let index = match (matches.as_slice(), pick) {
                ([], _) => bail!("No matching investment found."),
                ([only], None) => *only,
                (many, None) => {
                    let mut msg =
                        String::from("Several investments match; choose one with --pick:");
                    for (n, &i) in many.iter().take(VIEW_LIMIT).enumerate() {
                        let h = &portfolio.holdings[i];
                        write!(
                            msg,
                            "\n  {}. {} #{} bought for {} on {}",
                            n + 1,
                            h.item,
                            h.serial,
                            format_amount(h.price),
                            h.date.format("%Y-%m-%d"),
                        )?;
                    }
                    bail!(msg)
                }
                (many, Some(pick)) => *pick
                    .checked_sub(1)
                    .and_then(|p| many.get(p))
                    .with_context(|| format!("--pick must be between 1 and {}", many.len()))?,
            };
            let report = portfolio.sell(&ctx.catalog, policy, index, price, ctx.now)?;
            let verdict = match report.outcome {
                SaleOutcome::Win => "Win",
                SaleOutcome::Lose => "Lose",
                SaleOutcome::NoChange => "No change",
            };
            save(&mut ctx.store, INVESTMENTS_KEY, &ledger)?;
            format!(
                "Sold {} #{} for {} (bought for {}, current value {}).\n{verdict}: {:+}% after {} day(s).",
                report.sold.item,
                report.sold.serial,
                format_amount(report.sell_value),
                format_amount(report.sold.price),
                format_amount(report.current_value),
                report.percent_change,
                report.held_days,
            )
        }
        InvestCommand::View => {
            let holdings = portfolio.view(&ctx.catalog, policy);
            if holdings.is_empty() {
                return Ok("You have no investments.".to_string());
            }
            let mut out = String::from("Your investments:");
            for h in holdings {
                let serial = h.serial.map(|s| format!(" #{s}")).unwrap_or_default();
                write!(
                    out,
                    "\n  - {}{serial}: bought for {}, now {} ({:+}%)",
                    h.item,
                    format_amount(h.bought_for),
                    format_amount(h.current_value),
                    h.percent_change,
                )?;
            }
            out
        }
    };
    Ok(out)
}

fn load_giveaway<S: RecordStore>(store: &S) -> Result<Giveaway> {
    load(store, GIVEAWAY_KEY)?.context("no giveaway is running")
}

fn giveaway<S: RecordStore>(ctx: &mut Context<S>, cmd: GiveawayCommand) -> Result<String> {
    match cmd {
        GiveawayCommand::Create {
            prize,
            duration,
            channel_id,
        } => {
            let g = Giveaway::create(&prize, &duration, channel_id, ctx.now)?;
            save(&mut ctx.store, GIVEAWAY_KEY, &g)?;
            Ok(format!(
                "Giveaway for {} started in channel {}; ends {}.",
                g.prize,
                g.channel_id,
                g.end_time.format("%Y-%m-%d %H:%M UTC"),
            ))
        }
        GiveawayCommand::Join { invites } => {
            let counters: UsageCounters = load(&ctx.store, USES_KEY)?.unwrap_or_default();
            let bot_uses = counters.user(ctx.user);
            let mut g = load_giveaway(&ctx.store)?;
            let outcome = g.join(ctx.user, invites, bot_uses);
            save(&mut ctx.store, GIVEAWAY_KEY, &g)?;
            let chance = g.entry(ctx.user).map_or(0.0, |e| e.chance);
            Ok(match outcome {
                JoinOutcome::Joined => {
                    format!("You joined the giveaway with a chance of {chance:.2}.")
                }
                JoinOutcome::Updated => {
                    format!("Your entry was updated; chance is now {chance:.2}.")
                }
                JoinOutcome::Pinned => "Your entry is fixed by an administrator.".to_string(),
            })
        }
        GiveawayCommand::Force { user_id } => {
            let mut g = load_giveaway(&ctx.store)?;
            g.force_winner(user_id);
            save(&mut ctx.store, GIVEAWAY_KEY, &g)?;
            info!(user_id, "forced giveaway winner");
            Ok(format!("User {user_id} will win the giveaway."))
        }
        GiveawayCommand::Blacklist { user_id } => {
            let mut g = load_giveaway(&ctx.store)?;
            g.blacklist(user_id);
            save(&mut ctx.store, GIVEAWAY_KEY, &g)?;
            info!(user_id, "blacklisted giveaway entrant");
            Ok(format!("User {user_id} can no longer win the giveaway."))
        }
        GiveawayCommand::Draw { now } => {
            let g = load_giveaway(&ctx.store)?;
            if !now && !g.is_due(ctx.now) {
                let left = g.remaining(ctx.now);
                return Ok(format!(
                    "Giveaway for {} ends in {}h {}m.",
                    g.prize,
                    left.num_hours(),
                    left.num_minutes() % 60,
                ));
            }
            let prize = g.prize.clone();
            let mut source = RngSource::from_seed_option(ctx.config.rng_seed);
            let report = match g.finish(&mut source) {
                Ok(report) => report,
                Err(DrawError::NoEntries) => {
                    ctx.store.remove(GIVEAWAY_KEY)?;
                    info!(%prize, "giveaway ended without entries");
                    return Ok(format!(
                        "Giveaway for {prize} ended. No entries were recorded."
                    ));
                }
                Err(DrawError::NoEligibleEntries) => {
                    ctx.store.remove(GIVEAWAY_KEY)?;
                    info!(%prize, "giveaway ended without eligible entries");
                    return Ok(format!(
                        "Giveaway for {prize} ended. No eligible entries were recorded."
                    ));
                }
                Err(e) => return Err(e.into()),
            };
            ctx.store.remove(GIVEAWAY_KEY)?;
            Ok(format!(
                "Congratulations <@{}>! You won {} with a chance of {:.2}.\nHighest chance: <@{}> ({:.2}) of {} entries.",
                report.winner.user_id,
                report.prize,
                report.winner.chance,
                report.highest.user_id,
                report.highest.chance,
                report.entry_count,
            ))
        }
    }
}

fn tutorial<S: RecordStore>(ctx: &mut Context<S>, topic: Topic) -> Result<String> {
    record_use(&mut ctx.store, UsageKind::Tutorial, ctx.user)?;
    let text = match topic {
        Topic::Trading => {
            "Trading\n\
             List what you give with --offer and what you get with --counter. Each \
             entry is cash=<amount> (200k, 2.5M) or item=<name>[#serial]. Event and \
             miscellaneous items take no serial; auction items without one count as \
             a high serial. The result tells you whether you win or lose and by how much."
        }
        Topic::Investments => {
            "Investments\n\
             `invest add` records an item you bought and compares the price with its \
             current value. `invest view` shows your holdings and how they moved. \
             `invest sell` closes a holding at --price, or at the current value when \
             no price is given."
        }
        Topic::Values => {
            "Values\n\
             `value <name> [serial]` shows an item's value, demand and stability. \
             Leave the serial out for non-auction items; auction items without a \
             serial show the first price band. `suggest <text>` finds item names."
        }
    };
    Ok(text.to_string())
}

fn stats<S: RecordStore>(ctx: &mut Context<S>) -> Result<String> {
    let counters: UsageCounters = load(&ctx.store, USES_KEY)?.unwrap_or_default();
    let mut out = String::new();
    for (label, kind) in [
        ("value lookups", UsageKind::Value),
        ("trades", UsageKind::Trade),
        ("investments", UsageKind::Investment),
        ("tutorials", UsageKind::Tutorial),
    ] {
        writeln!(out, "{label}: {}", counters.total(kind))?;
    }
    write!(out, "your uses: {}", counters.user(ctx.user))?;
    Ok(out)
}
