//! versectl - inspect and maintain the verse reader cache

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::{debug, info};
use versecache::{CacheConfig, CacheTiers, Ttl, DEFAULT_SCHEMA_VERSION};

use crate::commands::{Budget, Tier};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory holding the small and large tiers
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Current schema version; entries written under another are stale
    #[arg(short, long, default_value = DEFAULT_SCHEMA_VERSION)]
    schema_version: String,

    /// Read cache size of the large tier, in bytes
    #[arg(long, default_value_t = default_read_cache_bytes())]
    read_cache_bytes: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete expired, stale and malformed entries from both tiers
    Purge,
    /// Print the value stored under a key
    Get { tier: Tier, key: String },
    /// Store a JSON value under a key
    Set {
        tier: Tier,
        key: String,
        json: String,
        /// hour, day, week, month or a number of seconds; omit to never expire
        #[arg(long)]
        ttl: Option<Ttl>,
    },
    /// Delete a key
    Remove { tier: Tier, key: String },
    /// Delete every key in a tier
    Clear { tier: Tier },
    /// List keys in a tier
    Keys { tier: Tier },
    /// Show a raw entry with its validity and expiry
    Inspect { tier: Tier, key: String },
    /// Rewrite the large-tier log without dead records
    Compact,
    /// Paginate a chapter from measured verse heights
    #[command(group(ArgGroup::new("budget_source").required(true).args(["budget", "viewport"])))]
    Paginate {
        /// JSON array of verses
        #[arg(long)]
        verses: PathBuf,
        /// JSON array of heights, one per verse
        #[arg(long)]
        heights: PathBuf,
        /// Usable page height
        #[arg(long)]
        budget: Option<f64>,
        /// Viewport height; the default safe area is reserved from it
        #[arg(long)]
        viewport: Option<f64>,
        /// Store the layout in the large tier
        #[arg(long)]
        persist: bool,
    },
}

fn default_read_cache_bytes() -> usize {
    CacheConfig::default().read_cache_bytes
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = CacheConfig {
        schema_version: args.schema_version,
        read_cache_bytes: args.read_cache_bytes,
    };
    let tiers = CacheTiers::open(&args.data, &config)
        .with_context(|| format!("Failed to open cache in {}", args.data.display()))?;
    info!("Data directory: {}", args.data.display());

    let output = run(&tiers, args.command).await?;
    debug!("small tier: {}", tiers.small.stats().snapshot());
    debug!("large tier: {}", tiers.large.stats().snapshot());
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

async fn run(tiers: &CacheTiers, command: Command) -> Result<String> {
    let output = match command {
        Command::Purge => commands::purge(tiers).await,
        Command::Get { tier, key } => match tier {
            Tier::Small => commands::get(&tiers.small, &key).await?,
            Tier::Large => commands::get(&tiers.large, &key).await?,
        },
        Command::Set { tier, key, json, ttl } => match tier {
            Tier::Small => commands::set(&tiers.small, &key, &json, ttl).await?,
            Tier::Large => commands::set(&tiers.large, &key, &json, ttl).await?,
        },
        Command::Remove { tier, key } => match tier {
            Tier::Small => commands::remove(&tiers.small, &key).await,
            Tier::Large => commands::remove(&tiers.large, &key).await,
        },
        Command::Clear { tier } => match tier {
            Tier::Small => commands::clear(&tiers.small).await,
            Tier::Large => commands::clear(&tiers.large).await,
        },
        Command::Keys { tier } => match tier {
            Tier::Small => commands::keys(&tiers.small).await?,
            Tier::Large => commands::keys(&tiers.large).await?,
        },
        Command::Inspect { tier, key } => match tier {
            Tier::Small => commands::inspect(&tiers.small, &key).await,
            Tier::Large => commands::inspect(&tiers.large, &key).await,
        },
        Command::Compact => commands::compact(tiers)?,
        Command::Paginate {
            verses,
            heights,
            budget,
            viewport,
            persist,
        } => {
            let budget = match (budget, viewport) {
                (Some(budget), _) => Budget::Explicit(budget),
                (None, Some(viewport)) => Budget::Viewport(viewport),
                (None, None) => anyhow::bail!("either --budget or --viewport is required"),
            };
            commands::paginate(tiers, &verses, &heights, budget, persist).await?
        }
    };
    Ok(output)
}
