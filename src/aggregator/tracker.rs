use crate::aggregator::{AggregateView, Aggregator};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedView {
    pub generation: u64,
    pub view: AggregateView,
}

/// Keeps the deal view for the most recently tracked id list.
///
/// Every call to [`DealTracker::track`] starts a new generation. Lookups of older
/// generations are left to finish (their results still land in the cache) but
/// their views are never published.
pub struct DealTracker {
    aggregator: Arc<Aggregator>,
    generation: Arc<AtomicU64>,
    tx: Arc<watch::Sender<TrackedView>>,
}

impl DealTracker {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        let (tx, _rx) = watch::channel(TrackedView {
            generation: 0,
            view: AggregateView::Ready { deals: Vec::new() },
        });
        Self {
            aggregator,
            generation: Arc::new(AtomicU64::new(0)),
            tx: Arc::new(tx),
        }
    }

    /// Starts pricing `ids` as a new generation. The handle resolves once the
    /// generation's lookups have all settled.
    pub fn track(&self, ids: Vec<u32>) -> (u64, JoinHandle<()>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let aggregator = self.aggregator.clone();
        let latest = self.generation.clone();
        let tx = self.tx.clone();
        debug!("Tracking {} app ids as generation {}", ids.len(), generation);

        let task = tokio::spawn(async move {
            aggregator
                .aggregate_with_progress(&ids, |view| {
                    tx.send_if_modified(|current| {
                        if latest.load(Ordering::SeqCst) != generation
                            || current.generation > generation
                        {
                            return false;
                        }
                        *current = TrackedView {
                            generation,
                            view: view.clone(),
                        };
                        true
                    });
                })
                .await;
        });

        (generation, task)
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackedView> {
        self.tx.subscribe()
    }

    #[cfg(test)]
    pub fn current(&self) -> TrackedView {
        self.tx.borrow().clone()
    }

    /// Waits until `generation` settles. Returns `None` once it has been superseded.
    pub async fn settled(&self, generation: u64) -> Option<AggregateView> {
        let mut rx = self.subscribe();
        let tracked = rx
            .wait_for(|t| {
                t.generation > generation || (t.generation == generation && !t.view.is_pending())
            })
            .await
            .ok()?;
        (tracked.generation == generation).then(|| tracked.view.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::testing::MockDeals;
    use crate::aggregator::DealCache;
    use std::time::Duration;

    fn tracker(api: Arc<MockDeals>) -> DealTracker {
        let cache = Arc::new(DealCache::new(Duration::from_secs(300)));
        DealTracker::new(Arc::new(Aggregator::new(api, cache, 50)))
    }

    fn appids(view: &AggregateView) -> Vec<u32> {
        match view {
            AggregateView::Ready { deals } => deals.iter().map(|d| d.appid).collect(),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn publishes_settled_view() {
        let tracker = tracker(Arc::new(MockDeals::default()));
        let (generation, _) = tracker.track(vec![10, 20, 30]);

        let view = tracker.settled(generation).await.unwrap();
        assert_eq!(appids(&view), vec![10, 20, 30]);
        assert_eq!(tracker.current().generation, generation);
    }

    #[tokio::test]
    async fn superseded_lists_are_never_published() {
        let api = Arc::new(MockDeals {
            delay: Duration::from_millis(20),
            ..Default::default()
        });
        let tracker = tracker(api);

        let (old, _) = tracker.track((1..=80).collect());
        let (new, _) = tracker.track(vec![400, 401]);
        assert!(new > old);

        let view = tracker.settled(new).await.unwrap();
        assert_eq!(appids(&view), vec![400, 401]);
        assert_eq!(tracker.settled(old).await, None);

        // let the old lookups drain
        tokio::time::sleep(Duration::from_millis(60)).await;
        let current = tracker.current();
        assert_eq!(current.generation, new);
        assert_eq!(appids(&current.view), vec![400, 401]);
    }

    #[tokio::test]
    async fn task_handle_resolves_after_the_final_view() {
        let tracker = tracker(Arc::new(MockDeals {
            delay: Duration::from_millis(5),
            ..Default::default()
        }));
        let (generation, task) = tracker.track((1..=60).collect());

        task.await.unwrap();
        let current = tracker.current();
        assert_eq!(current.generation, generation);
        assert_eq!(appids(&current.view).len(), 60);
    }

    #[tokio::test]
    async fn superseded_lookups_still_fill_the_cache() {
        let api = Arc::new(MockDeals {
            delay: Duration::from_millis(10),
            ..Default::default()
        });
        let tracker = tracker(api.clone());

        tracker.track(vec![1, 2]);
        let (other, _) = tracker.track(vec![3]);
        tracker.settled(other).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let (again, _) = tracker.track(vec![1, 2]);
        tracker.settled(again).await.unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }
}
