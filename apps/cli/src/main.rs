//! Babel CLI - Command-line interface for the Babel translation cache
//!
//! This CLI provides a `babel` command that translates text through the
//! two-tier cache, fans one input out to many languages, and maintains the
//! durable cache.

mod commands;
mod context;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, stats, sweep, translate};
use context::CliContext;

/// Babel - cached, rate-limit aware machine translation
#[derive(Parser, Debug)]
#[command(
    name = "babel",
    author,
    version,
    about = "Babel - cached, rate-limit aware machine translation",
    long_about = "Babel translates text through a provider API, caching results in memory and in a shared on-disk store.\nRepeated requests are served from the cache; transient provider failures are retried with backoff."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Workspace directory holding .babel/ (overrides BABEL_WORKSPACE)
    #[arg(short = 'w', long, env = "BABEL_WORKSPACE", global = true)]
    workspace: Option<PathBuf>,

    /// Provider override ("openai" or "mock")
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate one text
    Translate {
        /// Text to translate
        text: String,

        /// Target language
        #[arg(long)]
        to: String,

        /// Source language (auto-detected when omitted)
        #[arg(long)]
        from: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Translate one text into several languages at once
    ///
    /// Prints a JSON object mapping each language to its translation or error.
    Batch {
        /// Text to translate
        text: String,

        /// Target languages, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        to: Vec<String>,

        /// Source language (auto-detected when omitted)
        #[arg(long)]
        from: Option<String>,

        /// Maximum concurrent translations (defaults to the configured limit)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Delete expired entries from the durable cache
    Sweep,

    /// Show durable cache size and settings
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let ctx = CliContext::load(args.workspace, args.provider)?;

    match args.command {
        Command::Translate { text, to, from, json } => {
            translate::execute(&ctx, text, to, from, json).await?;
        }
        Command::Batch { text, to, from, concurrency } => {
            batch::execute(&ctx, text, to, from, concurrency).await?;
        }
        Command::Sweep => sweep::execute(&ctx)?,
        Command::Stats { json } => stats::execute(&ctx, json)?,
    }

    Ok(())
}
