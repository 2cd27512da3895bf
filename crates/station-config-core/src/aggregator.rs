// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Retrieval and decoding of chunk responses from the correlation store.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::correlation::{CorrelationId, CorrelationStore, CorrelationStoreError};
use crate::messages::{decode_response, PayloadError};
use crate::model::{ChunkResult, CommandKind};

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// The entry arrived but holds nothing usable.
    #[error("{0}")]
    Missing(String),
    #[error(transparent)]
    Store(#[from] CorrelationStoreError),
}

impl From<PayloadError> for ResponseError {
    fn from(err: PayloadError) -> Self {
        Self::Missing(err.to_string())
    }
}

/// Awaits chunk responses. Interpreting the item statuses is left to the
/// orchestrator.
#[derive(Clone)]
pub struct ResponseAggregator {
    store: Arc<dyn CorrelationStore>,
    poll_interval: Duration,
}

impl ResponseAggregator {
    pub fn new(store: Arc<dyn CorrelationStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    pub async fn await_response(
        &self,
        correlation_id: &CorrelationId,
        kind: CommandKind,
        timeout: Duration,
    ) -> Result<ChunkResult, ResponseError> {
        let payload = self
            .store
            .wait_for(correlation_id, timeout, self.poll_interval)
            .await?
            .ok_or(ResponseError::Timeout(timeout))?;

        let results = decode_response(kind, &payload)?;
        if results.is_empty() {
            return Err(ResponseError::Missing(
                "response carries no item results".to_string(),
            ));
        }

        debug!(
            "Received {} item results for {correlation_id}",
            results.len()
        );
        Ok(ChunkResult { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::InMemoryCorrelationStore;
    use crate::model::ItemStatus;
    use serde_json::json;

    fn aggregator() -> (Arc<InMemoryCorrelationStore>, ResponseAggregator) {
        let store = Arc::new(InMemoryCorrelationStore::new(Duration::from_secs(60)));
        let aggregator = ResponseAggregator::new(store.clone(), Duration::from_millis(50));
        (store, aggregator)
    }

    #[tokio::test]
    async fn test_returns_decoded_results() {
        let (store, aggregator) = aggregator();
        let id = CorrelationId::new();
        let payload = json!({
            "setVariableResult": [
                {"attributeStatus": "Rejected", "component": {"name": "A"}, "variable": {"name": "x"}}
            ]
        });
        store.put(id, payload.to_string()).await.expect("put failed");

        let result = aggregator
            .await_response(&id, CommandKind::SetVariables, Duration::from_secs(1))
            .await
            .expect("await failed");
        assert_eq!(result.len(), 1);
        assert_eq!(result.results[0].status, ItemStatus::Rejected);
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_response_times_out() {
        let (_store, aggregator) = aggregator();
        let err = aggregator
            .await_response(
                &CorrelationId::new(),
                CommandKind::SetVariables,
                Duration::from_secs(30),
            )
            .await
            .expect_err("must time out");
        assert!(matches!(err, ResponseError::Timeout(t) if t == Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_present_but_empty_is_missing() {
        for payload in ["", r#"{"setVariableResult": []}"#, "garbage"] {
            let (store, aggregator) = aggregator();
            let id = CorrelationId::new();
            store.put(id, payload.to_string()).await.expect("put failed");
            let err = aggregator
                .await_response(&id, CommandKind::SetVariables, Duration::from_secs(1))
                .await
                .expect_err("unusable payload must fail");
            assert!(
                matches!(err, ResponseError::Missing(_)),
                "payload {payload:?} produced {err:?}"
            );
        }
    }
}
