#![deny(warnings)]

//! Headless front-end for item values, trades, investments and giveaways.

mod args;
mod commands;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use persistence::JsonFileStore;
use tracing::info;
use tracing_subscriber::EnvFilter;
use value_core::{BotConfig, Catalog};

use crate::args::Cli;
use crate::commands::{run, Context};

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(user = cli.user, data_dir = %cli.data_dir.display(), "starting CLI");

    let config = match &cli.config {
        Some(path) => BotConfig::load(path)?,
        None => BotConfig::default(),
    };
    let catalog = Catalog::load(&cli.catalog)?;
    let mut ctx = Context {
        config,
        catalog,
        store: JsonFileStore::new(&cli.data_dir),
        user: cli.user,
        now: Utc::now(),
    };
    let out = run(&mut ctx, cli.command)?;
    println!("{out}");
    Ok(())
}
