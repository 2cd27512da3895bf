// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Correlation of asynchronous station responses with the requests that
//! caused them.
//!
//! The transport layer `put`s a response payload under the correlation id of
//! the request once it arrives; the engine waits for and `take`s it. Every id
//! is written at most once and read at most once. Entries nobody collects are
//! evicted after the store's TTL.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Unique token tying an outbound request to its eventual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Mints a fresh random id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error)]
pub enum CorrelationStoreError {
    #[error("correlation store unavailable: {0}")]
    Unavailable(String),
    #[error("a response for {0} was already stored")]
    Duplicate(CorrelationId),
}

/// Keyed, time-bounded response store shared between the transport layer and
/// the engine.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Stores the response payload for `id`. Called by the transport layer.
    async fn put(&self, id: CorrelationId, payload: String) -> Result<(), CorrelationStoreError>;

    /// Removes and returns the payload for `id`. `None` means it has not
    /// arrived (or has expired).
    async fn take(&self, id: &CorrelationId) -> Result<Option<String>, CorrelationStoreError>;

    /// Waits up to `timeout` for a payload under `id` and consumes it. A
    /// timeout too large to be represented as an instant waits without bound.
    ///
    /// The default implementation polls [`CorrelationStore::take`] every
    /// `poll_interval`; stores that can signal arrivals should override it.
    async fn wait_for(
        &self,
        id: &CorrelationId,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Option<String>, CorrelationStoreError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(payload) = self.take(id).await? {
                return Ok(Some(payload));
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }
}

#[derive(Debug)]
struct Entry {
    payload: String,
    stored_at: Instant,
}

/// Process-local [`CorrelationStore`] that wakes waiters as soon as a
/// response is stored.
#[derive(Debug)]
pub struct InMemoryCorrelationStore {
    entries: Mutex<HashMap<CorrelationId, Entry>>,
    arrivals: Notify,
    ttl: Duration,
}

impl InMemoryCorrelationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            arrivals: Notify::new(),
            ttl,
        }
    }

    /// Number of responses stored and not yet collected or expired.
    pub fn pending(&self) -> usize {
        self.lock()
            .map(|mut entries| {
                self.evict_expired(&mut entries);
                entries.len()
            })
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<CorrelationId, Entry>>, CorrelationStoreError> {
        self.entries
            .lock()
            .map_err(|_| CorrelationStoreError::Unavailable("lock poisoned".to_string()))
    }

    fn evict_expired(&self, entries: &mut HashMap<CorrelationId, Entry>) {
        let now = Instant::now();
        entries.retain(|id, entry| {
            let live = now.duration_since(entry.stored_at) < self.ttl;
            if !live {
                warn!("Evicting uncollected response for {id}");
            }
            live
        });
    }
}

#[async_trait]
impl CorrelationStore for InMemoryCorrelationStore {
    async fn put(&self, id: CorrelationId, payload: String) -> Result<(), CorrelationStoreError> {
        {
            let mut entries = self.lock()?;
            self.evict_expired(&mut entries);
            if entries.contains_key(&id) {
                return Err(CorrelationStoreError::Duplicate(id));
            }
            entries.insert(
                id,
                Entry {
                    payload,
                    stored_at: Instant::now(),
                },
            );
        }
        debug!("Stored response for {id}");
        self.arrivals.notify_waiters();
        Ok(())
    }

    async fn take(&self, id: &CorrelationId) -> Result<Option<String>, CorrelationStoreError> {
        let mut entries = self.lock()?;
        self.evict_expired(&mut entries);
        Ok(entries.remove(id).map(|entry| entry.payload))
    }

    async fn wait_for(
        &self,
        id: &CorrelationId,
        timeout: Duration,
        _poll_interval: Duration,
    ) -> Result<Option<String>, CorrelationStoreError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            // Register interest before checking so a put between the check
            // and the await is not missed.
            let arrival = self.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            if let Some(payload) = self.take(id).await? {
                return Ok(Some(payload));
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                        return self.take(id).await;
                    }
                }
                None => arrival.await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_put_then_take_consumes_entry() {
        let store = InMemoryCorrelationStore::new(TTL);
        let id = CorrelationId::new();
        store.put(id, "{}".to_string()).await.expect("put failed");

        assert_eq!(store.pending(), 1);
        assert_eq!(
            store.take(&id).await.expect("take failed"),
            Some("{}".to_string())
        );
        assert_eq!(store.take(&id).await.expect("take failed"), None);
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn test_second_put_is_rejected() {
        let store = InMemoryCorrelationStore::new(TTL);
        let id = CorrelationId::new();
        store.put(id, "a".to_string()).await.expect("put failed");
        let err = store
            .put(id, "b".to_string())
            .await
            .expect_err("second put must fail");
        assert!(matches!(err, CorrelationStoreError::Duplicate(dup) if dup == id));
    }

    #[tokio::test]
    async fn test_keys_do_not_interfere() {
        let store = InMemoryCorrelationStore::new(TTL);
        let first = CorrelationId::new();
        let second = CorrelationId::new();
        store.put(first, "one".to_string()).await.expect("put failed");
        store.put(second, "two".to_string()).await.expect("put failed");

        assert_eq!(
            store.take(&second).await.expect("take failed").as_deref(),
            Some("two")
        );
        assert_eq!(
            store.take(&first).await.expect("take failed").as_deref(),
            Some("one")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_wakes_on_put() {
        let store = Arc::new(InMemoryCorrelationStore::new(TTL));
        let id = CorrelationId::new();

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            writer
                .put(id, "late".to_string())
                .await
                .expect("put failed");
        });

        let started = Instant::now();
        let payload = store
            .wait_for(&id, Duration::from_secs(10), Duration::from_millis(100))
            .await
            .expect("wait failed");
        assert_eq!(payload.as_deref(), Some("late"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_waits_until_arrival() {
        let store = Arc::new(InMemoryCorrelationStore::new(Duration::MAX));
        let id = CorrelationId::new();

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            writer.put(id, "eventually".to_string()).await.expect("put failed");
        });

        let payload = store
            .wait_for(&id, Duration::MAX, Duration::from_millis(100))
            .await
            .expect("wait failed");
        assert_eq!(payload.as_deref(), Some("eventually"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let store = InMemoryCorrelationStore::new(TTL);
        let payload = store
            .wait_for(
                &CorrelationId::new(),
                Duration::from_secs(3),
                Duration::from_millis(100),
            )
            .await
            .expect("wait failed");
        assert_eq!(payload, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncollected_entries_expire() {
        let store = InMemoryCorrelationStore::new(Duration::from_secs(5));
        let id = CorrelationId::new();
        store.put(id, "{}".to_string()).await.expect("put failed");

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.pending(), 0);
        assert_eq!(store.take(&id).await.expect("take failed"), None);
    }

    /// Store relying on the polling `wait_for` provided by the trait.
    #[derive(Default)]
    struct PollingStore {
        entries: Mutex<HashMap<CorrelationId, String>>,
    }

    #[async_trait]
    impl CorrelationStore for PollingStore {
        async fn put(
            &self,
            id: CorrelationId,
            payload: String,
        ) -> Result<(), CorrelationStoreError> {
            self.entries.lock().unwrap().insert(id, payload);
            Ok(())
        }

        async fn take(
            &self,
            id: &CorrelationId,
        ) -> Result<Option<String>, CorrelationStoreError> {
            Ok(self.entries.lock().unwrap().remove(id))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_wait_for_polls_until_arrival() {
        let store = Arc::new(PollingStore::default());
        let id = CorrelationId::new();

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(750)).await;
            writer.put(id, "polled".to_string()).await.unwrap();
        });

        let payload = store
            .wait_for(&id, Duration::from_secs(5), Duration::from_millis(100))
            .await
            .expect("wait failed");
        assert_eq!(payload.as_deref(), Some("polled"));

        let missing = store
            .wait_for(
                &CorrelationId::new(),
                Duration::from_millis(350),
                Duration::from_millis(100),
            )
            .await
            .expect("wait failed");
        assert_eq!(missing, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_wait_for_accepts_unrepresentable_timeout() {
        let store = Arc::new(PollingStore::default());
        let id = CorrelationId::new();

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            writer.put(id, "polled".to_string()).await.unwrap();
        });

        let payload = store
            .wait_for(&id, Duration::MAX, Duration::from_millis(100))
            .await
            .expect("wait failed");
        assert_eq!(payload.as_deref(), Some("polled"));
    }
}
