mod cli;
mod config;
mod elements;
mod error;
mod index;
mod sources;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::elements::{ElementKey, Tier};

#[derive(Parser)]
#[command(
    name = "curio",
    version,
    about = "Multi-tier capability index for AI customization elements"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search elements by name or tag
    Search {
        /// Term to match; omit to list everything
        #[arg(default_value = "")]
        term: String,
        /// Restrict to tiers (comma-separated: local,remote,collection)
        #[arg(long, value_delimiter = ',')]
        tier: Vec<Tier>,
        /// Page size
        #[arg(long)]
        limit: Option<usize>,
        /// Page offset
        #[arg(long)]
        offset: Option<usize>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
    /// Show elements related to one element (key is type:name)
    Similar {
        key: ElementKey,
        /// Maximum related elements to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
    /// List elements declaring a verb
    Verbs {
        verb: String,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
    /// Rebuild the index now, ignoring the snapshot TTL
    Rebuild {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
    /// Show snapshot state and counts
    Status {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::CurioConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for command output and --json.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Search {
            term,
            tier,
            limit,
            offset,
            json,
        } => {
            cli::search::search(&config, term, tier, limit, offset, json).await?;
        }
        Command::Similar { key, limit, json } => {
            cli::similar::similar(&config, key, limit, json).await?;
        }
        Command::Verbs { verb, json } => {
            cli::verbs::verbs(&config, verb, json).await?;
        }
        Command::Rebuild { json } => {
            cli::rebuild::rebuild(&config, json).await?;
        }
        Command::Status { json } => {
            cli::status::status(&config, json)?;
        }
    }

    Ok(())
}
