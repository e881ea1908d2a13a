// Aggregator module: splits app ids into batches, fans out one lookup per batch
// and folds the per-batch results into a single view.

pub mod cache;
pub mod chunker;
pub mod status;
pub mod tracker;

pub use cache::{CacheStatus, QueryCache};
pub use chunker::{chunk_ids, Chunk, ChunkKey};
pub use status::{AggregateView, ChunkState};
pub use tracker::DealTracker;

use crate::client::DealsApi;
use crate::model::{Deal, FetchError};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type DealCache = QueryCache<ChunkKey, Arc<Vec<Deal>>>;

pub struct Aggregator {
    api: Arc<dyn DealsApi>,
    cache: Arc<DealCache>,
    batch_size: usize,
}

impl Aggregator {
    pub fn new(api: Arc<dyn DealsApi>, cache: Arc<DealCache>, batch_size: usize) -> Self {
        Self {
            api,
            cache,
            batch_size,
        }
    }

    /// Runs every batch lookup to completion and returns the settled view.
    pub async fn aggregate(&self, ids: &[u32]) -> AggregateView {
        self.aggregate_with_progress(ids, |view| {
            if let AggregateView::Pending { completed, total } = view {
                info!("Loading deals: {}/{} batches", completed, total);
            }
        })
        .await
    }

    /// Like [`Aggregator::aggregate`], calling `on_update` with the initial view
    /// and again every time a batch settles.
    pub async fn aggregate_with_progress<F>(&self, ids: &[u32], mut on_update: F) -> AggregateView
    where
        F: FnMut(&AggregateView),
    {
        let chunks = chunk_ids(ids, self.batch_size);
        info!("Aggregating {} app ids in {} batches", ids.len(), chunks.len());

        let mut states = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            states.push(match self.cache.peek(&chunk.key).await {
                Some(deals) => ChunkState::Succeeded(deals),
                None => ChunkState::Pending,
            });
        }
        let mut view = AggregateView::from_states(&states);
        on_update(&view);

        let mut in_flight: FuturesUnordered<_> = chunks
            .into_iter()
            .filter(|chunk| matches!(states[chunk.index], ChunkState::Pending))
            .map(|chunk| self.load_chunk(chunk))
            .collect();

        while let Some((index, result)) = in_flight.next().await {
            states[index] = match result {
                Ok(deals) => {
                    debug!("Batch {} returned {} deals", index, deals.len());
                    ChunkState::Succeeded(deals)
                }
                Err(e) => {
                    warn!("Batch {} failed: {}", index, e);
                    ChunkState::Failed(e)
                }
            };
            view = AggregateView::from_states(&states);
            on_update(&view);
        }

        view
    }

    async fn load_chunk(&self, chunk: Chunk) -> (usize, Result<Arc<Vec<Deal>>, FetchError>) {
        let api = self.api.clone();
        let ids = chunk.key.0.clone();
        let result = self
            .cache
            .load(chunk.key, move || async move {
                api.fetch_deals(&ids).await.map(Arc::new)
            })
            .await;
        (chunk.index, result)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::client::DealsApi;
    use crate::model::{Deal, DealPrices, FetchError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub(crate) fn deal(appid: u32) -> Deal {
        Deal {
            appid,
            name: format!("game {}", appid),
            url: format!("https://gg.deals/game/{}/", appid),
            image_url: String::new(),
            prices: DealPrices {
                retail_price: 4.99,
                retail_price_low: 1.99,
                keyshop_price: 2.49,
                keyshop_price_low: 0.99,
            },
            currency: "USD".into(),
        }
    }

    /// Pricing service stand-in: one deal per requested id, optional failure and delay.
    #[derive(Default)]
    pub(crate) struct MockDeals {
        pub calls: AtomicUsize,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub fail_on: Option<u32>,
        pub fail_status: Option<u16>,
        pub delay: Duration,
    }

    #[async_trait::async_trait]
    impl DealsApi for MockDeals {
        async fn fetch_deals(&self, appids: &[u32]) -> Result<Vec<Deal>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.is_some_and(|id| appids.contains(&id)) {
                return Err(FetchError::InvalidResponse {
                    status: self.fail_status.unwrap_or(502),
                    body: "Invalid data structure from DealsGG API.".into(),
                });
            }
            Ok(appids.iter().copied().map(deal).collect())
        }
    }
}
