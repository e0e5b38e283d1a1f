//! Content loading state with last-request-wins semantics.
//!
//! Every fetch takes a [`RequestTicket`]. Only the most recently issued
//! ticket is allowed to settle the loader; anything older that finishes late
//! is dropped. A failed load keeps the previous good value around so callers
//! can keep rendering it.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

struct Slot<T> {
    state: LoadState,
    latest: u64,
    value: Option<T>,
}

pub struct ContentLoader<T> {
    issued: AtomicU64,
    slot: RwLock<Slot<T>>,
}

impl<T: Clone> Default for ContentLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ContentLoader<T> {
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            slot: RwLock::new(Slot {
                state: LoadState::Idle,
                latest: 0,
                value: None,
            }),
        }
    }

    /// Starts a request. Any ticket issued earlier becomes stale.
    pub async fn begin(&self) -> RequestTicket {
        let id = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let mut slot = self.slot.write().await;
        if id > slot.latest {
            slot.latest = id;
            slot.state = LoadState::Loading;
        }
        RequestTicket(id)
    }

    /// Settles the request behind `ticket`. Returns false, leaving the loader
    /// untouched, when a newer request has been issued since.
    pub async fn finish(&self, ticket: RequestTicket, result: Result<T>) -> bool {
        let mut slot = self.slot.write().await;
        if ticket.0 != slot.latest {
            tracing::debug!("Discarding stale response for request {} (latest is {})", ticket.0, slot.latest);
            return false;
        }
        match result {
            Ok(value) => {
                slot.value = Some(value);
                slot.state = LoadState::Loaded;
            }
            Err(e) => {
                tracing::warn!("Content load failed: {}", e);
                slot.state = LoadState::Error(e.to_string());
            }
        }
        true
    }

    /// Runs `fetch` under a fresh ticket and returns whatever value is current
    /// afterwards: the new one on success, the last good one otherwise.
    pub async fn load<F, Fut>(&self, fetch: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let ticket = self.begin().await;
        let result = fetch().await;
        self.finish(ticket, result).await;
        self.current().await
    }

    pub async fn state(&self) -> LoadState {
        self.slot.read().await.state.clone()
    }

    /// Last successfully loaded value, if any.
    pub async fn current(&self) -> Option<T> {
        self.slot.read().await.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn test_idle_loading_loaded() {
        let loader: ContentLoader<Vec<u32>> = ContentLoader::new();
        assert_eq!(loader.state().await, LoadState::Idle);

        let ticket = loader.begin().await;
        assert_eq!(loader.state().await, LoadState::Loading);

        assert!(loader.finish(ticket, Ok(vec![1, 2])).await);
        assert_eq!(loader.state().await, LoadState::Loaded);
        assert_eq!(loader.current().await, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_error_keeps_last_good_value() {
        let loader: ContentLoader<Vec<u32>> = ContentLoader::new();
        loader.load(|| async { Ok(vec![7]) }).await;

        let value = loader
            .load(|| async { Err(Error::RemoteUnavailable("connection refused".into())) })
            .await;

        assert_eq!(value, Some(vec![7]));
        assert!(matches!(loader.state().await, LoadState::Error(_)));
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let loader: ContentLoader<&'static str> = ContentLoader::new();
        let slow = loader.begin().await;
        let fast = loader.begin().await;

        assert!(loader.finish(fast, Ok("newer")).await);
        assert!(!loader.finish(slow, Ok("older")).await);
        assert_eq!(loader.current().await, Some("newer"));
        assert_eq!(loader.state().await, LoadState::Loaded);
    }

    #[tokio::test]
    async fn test_superseded_request_cannot_settle_early() {
        let loader: ContentLoader<u32> = ContentLoader::new();
        let first = loader.begin().await;
        let _second = loader.begin().await;

        assert!(!loader.finish(first, Ok(1)).await);
        assert_eq!(loader.state().await, LoadState::Loading);
        assert_eq!(loader.current().await, None);
    }
}
