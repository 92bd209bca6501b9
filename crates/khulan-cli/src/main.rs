//! Khulan operator CLI
//!
//! Rebuilds, flushes and queries the content cache of a site.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use khulan_sdk::{Khulan, DEFAULT_PASSES};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "khulan", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to config/khulan.{yaml,toml,json})
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Site root holding content/, accounts/ and blueprints/
    #[arg(long, env = "KHULAN_SITE_ROOT")]
    root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Index every page, file and user
    Reindex {
        /// Passes over the corpus; relations resolve from the second pass on
        #[arg(long, default_value_t = DEFAULT_PASSES)]
        passes: usize,
    },
    /// Drop the content collection
    Flush,
    /// Look up entities by id, uuid, email or cache key, or by a JSON filter
    Find {
        /// `blog/hello-world`, `thomas@example.com` or `{"tags[,]": "Punk"}`
        query: String,
    },
    /// Manage the key-value cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
enum CacheAction {
    /// Remove expired entries
    Clean,
    /// Remove every entry
    Flush,
    /// Time set, get and remove against the key-value cache
    Benchmark {
        /// Number of keys to write
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.source.root = root;
    }
    info!("Using {:?} document store", config.store.backend);

    let khulan = Khulan::builder().with_config(config).build()?;

    match cli.command {
        Command::Reindex { passes } => commands::reindex(&khulan, passes).await,
        Command::Flush => commands::flush(&khulan).await,
        Command::Find { query } => commands::find(&khulan, &query).await,
        Command::Cache { action } => match action {
            CacheAction::Clean => commands::cache_clean(&khulan).await,
            CacheAction::Flush => commands::cache_flush(&khulan).await,
            CacheAction::Benchmark { count } => commands::cache_benchmark(&khulan, count).await,
        },
    }
}

/// Initialize tracing subscriber
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "khulan_cli=info,khulan_sdk=info,khulan_store=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
