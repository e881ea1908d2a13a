mod aggregator;
mod client;
mod config;
mod model;
mod utils;
mod wishlist;

use aggregator::{chunk_ids, AggregateView, Aggregator, CacheStatus, DealCache, DealTracker};
use clap::Parser;
use client::{ApiClient, WishlistApi};
use config::load_config;
use model::Deal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use utils::format_price;
use wishlist::app_ids_by_priority;

/// Prices a Steam wishlist against current retail and keyshop deals.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Steam account id (falls back to `steam_id` from the config)
    steam_id: Option<String>,

    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Keep running and refresh on the configured interval
    #[arg(short, long)]
    watch: bool,

    /// Only price the N most wanted games
    #[arg(short, long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Panic occurred: {:?}", panic_info);
    }));

    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    let Some(steam_id) = cli.steam_id.clone().or_else(|| config.steam_id.clone()) else {
        error!("No Steam id given on the command line or in the config");
        return;
    };

    let client = match ApiClient::new(
        &config.api_base_url,
        Duration::from_secs(config.request_timeout_seconds),
    ) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return;
        }
    };

    let cache = Arc::new(DealCache::new(Duration::from_secs(config.cache_ttl_seconds)));
    let aggregator = Arc::new(Aggregator::new(client.clone(), cache.clone(), config.batch_size));
    if !cli.watch {
        if let Some(ids) = fetch_app_ids(client.as_ref(), &steam_id, cli.limit).await {
            let view = aggregator.aggregate(&ids).await;
            report(view, &cache, &ids, config.batch_size).await;
        }
        return;
    }

    let tracker = DealTracker::new(aggregator);
    loop {
        if let Some(ids) = fetch_app_ids(client.as_ref(), &steam_id, cli.limit).await {
            if let Some(view) = follow(&tracker, ids.clone()).await {
                report(view, &cache, &ids, config.batch_size).await;
            }
        }

        let purged = cache.purge_stale().await;
        info!(
            "Dropped {} stale deal batches, {} still cached",
            purged,
            cache.len().await
        );

        info!("Waiting {}s before the next refresh...", config.refresh_interval_seconds);
        tokio::select! {
            _ = sleep(Duration::from_secs(config.refresh_interval_seconds)) => {
                info!("Timer triggered.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down.");
                break;
            }
        }
    }
}

/// Wishlist app ids, most wanted first.
async fn fetch_app_ids(
    wishlist_api: &dyn WishlistApi,
    steam_id: &str,
    limit: Option<usize>,
) -> Option<Vec<u32>> {
    info!("Fetching wishlist for {}...", steam_id);
    let items = match wishlist_api.fetch_wishlist(steam_id).await {
        Ok(items) => items,
        Err(e) => {
            warn!("Wishlist fetch failed: {}", e);
            return None;
        }
    };

    let ids = app_ids_by_priority(&items, limit);
    info!("{} wishlist items, pricing {}", items.len(), ids.len());
    Some(ids)
}

/// Tracks `ids` and logs progress until the generation settles.
/// Returns `None` if the aggregation task dies or the list is superseded.
async fn follow(tracker: &DealTracker, ids: Vec<u32>) -> Option<AggregateView> {
    let mut rx = tracker.subscribe();
    let (generation, mut task) = tracker.track(ids);
    let settled = tracker.settled(generation);
    tokio::pin!(settled);

    loop {
        tokio::select! {
            view = &mut settled => return view,
            joined = &mut task => {
                if let Err(e) = joined {
                    error!("Deal aggregation task failed: {}", e);
                    return None;
                }
                return tracker.settled(generation).await;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    return None;
                }
                let tracked = rx.borrow_and_update().clone();
                if tracked.generation != generation {
                    continue;
                }
                if let AggregateView::Pending { completed, total } = tracked.view {
                    info!("Loading deals: {}/{} batches", completed, total);
                }
            }
        }
    }
}

async fn report(view: AggregateView, cache: &DealCache, ids: &[u32], batch_size: usize) {
    match view {
        AggregateView::Pending { completed, total } => {
            warn!("Deals still loading: {}/{} batches", completed, total);
        }
        AggregateView::Failed { error, failed_chunks } => {
            error!("Failed to load deals ({} batches failed): {}", failed_chunks, error);
            for chunk in chunk_ids(ids, batch_size) {
                let Some(snapshot) = cache.snapshot(&chunk.key).await else {
                    continue;
                };
                if snapshot.status != CacheStatus::Failed {
                    continue;
                }
                warn!(
                    "Batch {} ({} ids from {}) failed at {}: {}",
                    chunk.index,
                    chunk.ids().len(),
                    chunk.ids().first().copied().unwrap_or_default(),
                    snapshot.updated_at,
                    snapshot.error.map(|e| e.to_string()).unwrap_or_default()
                );
            }
        }
        AggregateView::Ready { deals } => render(&deals),
    }
}

fn render(deals: &[Deal]) {
    if deals.is_empty() {
        println!("No deals found for this wishlist.");
        return;
    }

    for deal in deals {
        let currency = deal.currency.as_str();
        println!("{} ({})", deal.name, deal.appid);
        println!(
            "  retail:  {} (lowest {})",
            format_price(deal.prices.retail_price, currency),
            format_price(deal.prices.retail_price_low, currency)
        );
        println!(
            "  keyshop: {} (lowest {})",
            format_price(deal.prices.keyshop_price, currency),
            format_price(deal.prices.keyshop_price_low, currency)
        );
        if let Some((store, price)) = deal.best_offer() {
            println!("  best:    {} at {}", format_price(price, currency), store);
        }
        println!("  {}", deal.url);
    }
}
