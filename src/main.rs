// src/main.rs
use anyhow::Context;
use channel_cache_sync::{
    cache::{CacheStore, MemoryCacheStore, RedisCacheStore},
    config::load_config,
    utils::setup_logging,
    ChannelCacheService, SourceClient, StaticSession, YouTubeClient,
};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "channel-cache-sync")]
#[command(about = "Keeps a per-user cache of subscribed YouTube channels in sync")]
struct Cli {
    /// User whose cache is operated on
    #[arg(short, long, env = "CHANNEL_CACHE_USER")]
    user: Option<String>,

    /// Upstream OAuth access token
    #[arg(short, long, env = "YOUTUBE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Use the in-process store instead of Redis (state is lost on exit)
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh every cached entry of the user
    Refresh,
    /// Register a channel for the user
    Subscribe { channel_id: String },
    /// Remove an entry by entry id or channel id
    Unsubscribe { id: String },
    /// List cached channels
    List {
        /// Only featured entries
        #[arg(long)]
        featured: bool,
    },
    /// Newest items across the user's channels
    NewReleases,
    /// Mark or unmark an entry as featured
    Feature {
        id: String,
        /// Clear the flag instead of setting it
        #[arg(long)]
        off: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config().context("invalid configuration")?;
    setup_logging(config.log_level).context("failed to initialize logging")?;
    info!("🚀 channel-cache-sync starting");

    let source: Arc<dyn SourceClient> = Arc::new(YouTubeClient::from_config(&config)?);
    let store: Arc<dyn CacheStore> = if cli.memory {
        info!("Using in-memory cache store");
        Arc::new(MemoryCacheStore::new())
    } else {
        Arc::new(RedisCacheStore::new(&config.redis_url, &config.redis_key_prefix).await?)
    };

    let service = ChannelCacheService::from_config(&config, source, store);
    let session = StaticSession::new(cli.user, cli.token);

    match cli.command {
        Command::Refresh => {
            let result = service.refresh(&session).await?;
            if !result.ok {
                error!("Refresh did not complete: {:?}", result.error_kind);
            }
            print_json(&result)?;
        }
        Command::Subscribe { channel_id } => {
            print_json(&service.subscribe(&session, &channel_id).await?)?;
        }
        Command::Unsubscribe { id } => {
            let removed = service.unsubscribe(&session, &id).await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Command::List { featured } => {
            let entries = if featured {
                service.list_featured(&session).await?
            } else {
                service.list_channels(&session).await?
            };
            print_json(&entries)?;
        }
        Command::NewReleases => {
            print_json(&service.list_new_releases(&session).await?)?;
        }
        Command::Feature { id, off } => {
            print_json(&service.set_featured_by_id(&session, &id, !off).await?)?;
        }
    }

    Ok(())
}
