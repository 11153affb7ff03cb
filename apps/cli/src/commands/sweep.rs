//! `babel sweep`: bulk deletion of expired durable entries.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::context::CliContext;

/// Execute the sweep command.
pub fn execute(ctx: &CliContext) -> Result<()> {
    let cache = ctx.tier_two()?;
    let removed = cache.sweep_expired().context("Failed to sweep expired entries")?;

    println!("{} {} expired entries", "Removed".green(), removed);
    Ok(())
}
