// Query cache: key -> {status, value, timestamp}, with in-flight sharing and a freshness window.
use crate::model::FetchError;
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

type SharedLoad<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

enum EntryState<V: Clone> {
    Pending(SharedLoad<V>),
    Succeeded(V),
    Failed(FetchError),
}

struct Entry<V: Clone> {
    state: EntryState<V>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub status: CacheStatus,
    pub updated_at: DateTime<Utc>,
    pub error: Option<FetchError>,
}

pub struct QueryCache<K, V: Clone> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    fn is_fresh(&self, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - updated_at < self.ttl
    }

    /// Returns a fresh cached value, joins an in-flight lookup for `key`,
    /// or starts a new one with `loader`. Failures are never served from cache.
    pub async fn load<F, Fut>(&self, key: K, loader: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock().await;
            let now = self.clock.now();
            match entries.get(&key) {
                Some(Entry {
                    state: EntryState::Succeeded(value),
                    updated_at,
                }) if self.is_fresh(*updated_at, now) => {
                    debug!("cache hit");
                    return Ok(value.clone());
                }
                Some(Entry {
                    state: EntryState::Pending(in_flight),
                    ..
                }) => {
                    debug!("joining in-flight lookup");
                    in_flight.clone()
                }
                _ => {
                    let fresh = loader().boxed().shared();
                    entries.insert(
                        key.clone(),
                        Entry {
                            state: EntryState::Pending(fresh.clone()),
                            updated_at: now,
                        },
                    );
                    fresh
                }
            }
        };

        let result = shared.clone().await;
        self.settle(&key, &shared, &result).await;
        result
    }

    async fn settle(&self, key: &K, shared: &SharedLoad<V>, result: &Result<V, FetchError>) {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        let same_lookup = matches!(&entry.state, EntryState::Pending(current) if current.ptr_eq(shared));
        if !same_lookup {
            return;
        }
        entry.state = match result {
            Ok(value) => EntryState::Succeeded(value.clone()),
            Err(e) => EntryState::Failed(e.clone()),
        };
        entry.updated_at = self.clock.now();
    }

    /// Fresh succeeded value for `key`, without starting a lookup.
    pub async fn peek(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().await;
        let now = self.clock.now();
        match entries.get(key) {
            Some(Entry {
                state: EntryState::Succeeded(value),
                updated_at,
            }) if self.is_fresh(*updated_at, now) => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn snapshot(&self, key: &K) -> Option<CacheSnapshot> {
        let entries = self.entries.lock().await;
        entries.get(key).map(|entry| {
            let (status, error) = match &entry.state {
                EntryState::Pending(_) => (CacheStatus::Pending, None),
                EntryState::Succeeded(_) => (CacheStatus::Succeeded, None),
                EntryState::Failed(e) => (CacheStatus::Failed, Some(e.clone())),
            };
            CacheSnapshot {
                status,
                updated_at: entry.updated_at,
                error,
            }
        })
    }

    /// Drops failed entries and succeeded entries past the freshness window.
    /// Returns the number of entries removed.
    pub async fn purge_stale(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();
        let before = entries.len();
        entries.retain(|_, entry| match entry.state {
            EntryState::Pending(_) => true,
            EntryState::Succeeded(_) => self.is_fresh(entry.updated_at, now),
            EntryState::Failed(_) => false,
        });
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
