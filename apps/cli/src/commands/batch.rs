//! `babel batch`: one text, many target languages.

use anyhow::Result;
use babel_core::{BatchRequest, Caller};
use colored::Colorize;

use crate::context::CliContext;

/// Execute the batch command.
///
/// Per-language failures are part of the printed result and do not fail the
/// command.
pub async fn execute(
    ctx: &CliContext,
    text: String,
    to: Vec<String>,
    from: Option<String>,
    concurrency: Option<usize>,
) -> Result<()> {
    let service = ctx.service()?;
    let request = BatchRequest {
        input: text,
        source_variant: from,
        target_variants: to,
        concurrency_limit: concurrency,
    };

    let report = service.translate_batch(&Caller::Anonymous, request).await;
    service.flush().await;
    let report = report?;

    println!("{}", serde_json::to_string_pretty(&report.outcomes)?);
    if !report.is_complete_success() {
        eprintln!(
            "{}",
            format!("{} of {} translations failed", report.failed, report.total_variants())
                .yellow()
        );
    }

    Ok(())
}
