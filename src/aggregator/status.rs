use crate::model::{Deal, FetchError};
use std::sync::Arc;

/// Settle state of one chunk lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkState {
    Pending,
    Succeeded(Arc<Vec<Deal>>),
    Failed(FetchError),
}

/// Combined view over every chunk of one identifier list.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateView {
    /// At least one chunk is still in flight. `completed` counts succeeded chunks only.
    Pending { completed: usize, total: usize },
    /// Every chunk settled and at least one failed; `error` is the first failure by chunk order.
    Failed { error: FetchError, failed_chunks: usize },
    /// Every chunk succeeded; deals are concatenated in chunk order.
    Ready { deals: Vec<Deal> },
}

impl AggregateView {
    pub fn from_states(states: &[ChunkState]) -> Self {
        if states.iter().any(|s| matches!(s, ChunkState::Pending)) {
            let completed = states
                .iter()
                .filter(|s| matches!(s, ChunkState::Succeeded(_)))
                .count();
            return AggregateView::Pending {
                completed,
                total: states.len(),
            };
        }

        let mut failures = states.iter().filter_map(|s| match s {
            ChunkState::Failed(e) => Some(e),
            _ => None,
        });
        if let Some(first) = failures.next() {
            return AggregateView::Failed {
                error: first.clone(),
                failed_chunks: 1 + failures.count(),
            };
        }

        let deals = states
            .iter()
            .filter_map(|s| match s {
                ChunkState::Succeeded(deals) => Some(deals.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();
        AggregateView::Ready { deals }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AggregateView::Pending { .. })
    }
}
