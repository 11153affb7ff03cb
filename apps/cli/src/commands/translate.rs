//! `babel translate`: one text, one target language.

use anyhow::{Context, Result};
use babel_core::{Caller, TranslateRequest};
use colored::Colorize;

use crate::context::CliContext;

/// Execute the translate command.
pub async fn execute(
    ctx: &CliContext,
    text: String,
    to: String,
    from: Option<String>,
    json: bool,
) -> Result<()> {
    let service = ctx.service()?;
    let request = TranslateRequest { input: text, source_variant: from, target_variant: to };

    let outcome = service.translate(&Caller::Anonymous, request).await;
    // Durable writes finish before the process exits, even on failure.
    service.flush().await;

    let response = outcome.context("Translation failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.output);
        if response.served_from_cache {
            eprintln!("{}", "(served from cache)".dimmed());
        }
    }

    Ok(())
}
