//! `babel stats`: durable cache size and effective settings.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::context::CliContext;

#[derive(Debug, Serialize)]
struct CacheSummary {
    workspace: String,
    database: String,
    durable_entries: usize,
    schema_version: u32,
    tier_one_ttl_secs: u64,
    tier_two_ttl_secs: u64,
    key_prefix_chars: Option<usize>,
    provider: String,
    model: String,
}

/// Execute the stats command.
pub fn execute(ctx: &CliContext, json: bool) -> Result<()> {
    let cache = ctx.tier_two()?;
    let config = ctx.config();
    let summary = CacheSummary {
        workspace: ctx.workspace().display().to_string(),
        database: ctx.database_path().display().to_string(),
        durable_entries: cache.len().context("Failed to count cache entries")?,
        schema_version: config.cache.schema_version,
        tier_one_ttl_secs: config.cache.tier_one_ttl_secs,
        tier_two_ttl_secs: config.cache.tier_two_ttl_secs,
        key_prefix_chars: config.cache.key_prefix_chars,
        provider: config.inference.provider.clone(),
        model: config.inference.model.clone(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "Babel cache".bold());
    println!("  Workspace:        {}", summary.workspace);
    println!("  Database:         {}", summary.database);
    println!("  Durable entries:  {}", summary.durable_entries.to_string().cyan());
    println!("  Schema version:   {}", summary.schema_version);
    println!("  Tier one TTL:     {}s", summary.tier_one_ttl_secs);
    println!("  Tier two TTL:     {}s", summary.tier_two_ttl_secs);
    match summary.key_prefix_chars {
        Some(chars) => println!("  Key policy:       first {chars} chars"),
        None => println!("  Key policy:       full input"),
    }
    println!("  Provider:         {} ({})", summary.provider, summary.model);
    Ok(())
}
