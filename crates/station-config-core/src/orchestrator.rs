// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sequential chunk loop tying limit lookup, planning, dispatch and response
//! correlation together.
//!
//! An operation moves through `Planning -> Dispatching(i) -> AwaitingResponse(i)
//! -> Folding(i)` for every chunk and ends in `Done` or `Failed`. Chunk `i + 1`
//! is only dispatched once chunk `i` has been folded: stations process
//! configuration requests one at a time. Every response is folded, even once
//! both outcome flags are set, so no correlation entry is left behind.
//!
//! A failure abandons the remaining chunks. Chunks already dispatched stay
//! applied on the station; nothing is rolled back.

use std::slice::Chunks;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::aggregator::{ResponseAggregator, ResponseError};
use crate::attributes::{AttributeStore, ItemLimitLookup};
use crate::config::EngineConfig;
use crate::correlation::{CorrelationId, CorrelationStore};
use crate::dispatcher::Dispatcher;
use crate::error::BatchError;
use crate::messages::validate_items;
use crate::model::{
    AggregateOutcome, BatchReport, ChunkResult, CommandKind, ConfigurationItem, ItemStatus,
    SessionParty, StationId,
};
use crate::planner::ChunkPlan;
use crate::transport::Transport;

impl AggregateOutcome {
    /// Folds every item status of `result` into the flags. Flags only ever go
    /// from `false` to `true`.
    pub fn absorb(&mut self, result: &ChunkResult) {
        for item in &result.results {
            match item.status {
                ItemStatus::Rejected => self.any_rejected = true,
                ItemStatus::RebootRequired => self.any_reboot_required = true,
                ItemStatus::Accepted
                | ItemStatus::UnknownComponent
                | ItemStatus::UnknownVariable
                | ItemStatus::NotSupportedAttributeType
                | ItemStatus::Other => {}
            }
        }
    }
}

enum Phase<'a> {
    Planning,
    Dispatching {
        chunk_index: usize,
        chunk: &'a [ConfigurationItem],
    },
    AwaitingResponse {
        chunk_index: usize,
        expected_items: usize,
        correlation_id: CorrelationId,
    },
    Folding {
        chunk_index: usize,
        expected_items: usize,
        result: ChunkResult,
    },
    Done,
    Failed(BatchError),
}

/// State of one `run_batched_command` invocation.
struct Operation<'a> {
    station_id: &'a StationId,
    party: &'a SessionParty,
    kind: CommandKind,
    items: &'a [ConfigurationItem],
    chunks: Option<Chunks<'a, ConfigurationItem>>,
    deadline: Option<Instant>,
    cancel: &'a CancellationToken,
    report: BatchReport,
}

impl<'a> Operation<'a> {
    fn next_phase(&mut self, chunk_index: usize) -> Phase<'a> {
        match self.chunks.as_mut().and_then(Iterator::next) {
            Some(chunk) => Phase::Dispatching { chunk_index, chunk },
            None => Phase::Done,
        }
    }

    /// Resolves once the operation deadline is reached; never without one.
    async fn deadline_reached(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Response wait clamped to what is left of the operation deadline. Zero
    /// still collects a response that has already arrived.
    fn wait_budget(&self, response_timeout: Duration) -> Duration {
        match self.deadline {
            None => response_timeout,
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(response_timeout),
        }
    }
}

/// Runs chunked configuration commands against stations.
///
/// The orchestrator keeps no per-operation state, so one instance can serve
/// operations for many stations concurrently.
#[derive(Clone)]
pub struct BatchOrchestrator {
    limits: ItemLimitLookup,
    dispatcher: Dispatcher,
    aggregator: ResponseAggregator,
    config: EngineConfig,
}

impl BatchOrchestrator {
    pub fn new(
        attribute_store: Arc<dyn AttributeStore>,
        transport: Arc<dyn Transport>,
        correlation_store: Arc<dyn CorrelationStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            limits: ItemLimitLookup::new(attribute_store),
            dispatcher: Dispatcher::new(transport),
            aggregator: ResponseAggregator::new(correlation_store, config.poll_interval),
            config,
        }
    }

    /// Applies `items` to the station in as many chunks as its
    /// items-per-message limit requires and returns the folded outcome.
    pub async fn run_batched_command(
        &self,
        station_id: &StationId,
        party: &SessionParty,
        kind: CommandKind,
        items: &[ConfigurationItem],
    ) -> Result<AggregateOutcome, BatchError> {
        let cancel = CancellationToken::new();
        self.run_batched_command_report(station_id, party, kind, items, &cancel)
            .await
            .map(|report| report.outcome)
    }

    /// Like [`BatchOrchestrator::run_batched_command`], but stops at the
    /// next chunk boundary or wait once `cancel` fires, and returns every item
    /// result alongside the outcome.
    pub async fn run_batched_command_report(
        &self,
        station_id: &StationId,
        party: &SessionParty,
        kind: CommandKind,
        items: &[ConfigurationItem],
        cancel: &CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        let mut op = Operation {
            station_id,
            party,
            kind,
            items,
            chunks: None,
            // A deadline too far out to be represented is no deadline.
            deadline: self
                .config
                .operation_deadline
                .and_then(|deadline| Instant::now().checked_add(deadline)),
            cancel,
            report: BatchReport::default(),
        };

        let mut phase = Phase::Planning;
        loop {
            phase = match phase {
                Phase::Planning => self.plan(&mut op).await,
                Phase::Dispatching { chunk_index, chunk } => {
                    self.dispatch(&mut op, chunk_index, chunk).await
                }
                Phase::AwaitingResponse {
                    chunk_index,
                    expected_items,
                    correlation_id,
                } => {
                    self.await_response(&op, chunk_index, expected_items, correlation_id)
                        .await
                }
                Phase::Folding {
                    chunk_index,
                    expected_items,
                    result,
                } => Self::fold(&mut op, chunk_index, expected_items, result),
                Phase::Done => {
                    info!(
                        "{kind} on station {station_id} finished after {} chunks: rejected={}, reboot_required={}",
                        op.report.chunks_dispatched,
                        op.report.outcome.any_rejected,
                        op.report.outcome.any_reboot_required
                    );
                    return Ok(op.report);
                }
                Phase::Failed(err) => {
                    error!("{kind} on station {station_id} failed: {err}");
                    return Err(err);
                }
            };
        }
    }

    async fn plan<'a>(&self, op: &mut Operation<'a>) -> Phase<'a> {
        if let Err(err) = validate_items(op.kind, op.items) {
            return Phase::Failed(BatchError::Configuration {
                station_id: op.station_id.clone(),
                kind: op.kind,
                reason: err.to_string(),
            });
        }

        let limit = match self.limits.limit_for(op.station_id, op.kind).await {
            Ok(limit) => limit,
            Err(err) => return Phase::Failed(BatchError::from_lookup(op.station_id, op.kind, err)),
        };

        let plan = ChunkPlan::new(op.items, limit);
        debug!(
            "Planned {} chunks for {} {} items on station {} (limit {limit})",
            plan.len(),
            op.items.len(),
            op.kind,
            op.station_id
        );
        op.chunks = Some(plan.iter());
        op.next_phase(0)
    }

    async fn dispatch<'a>(
        &self,
        op: &mut Operation<'a>,
        chunk_index: usize,
        chunk: &'a [ConfigurationItem],
    ) -> Phase<'a> {
        if op.cancel.is_cancelled() {
            return Phase::Failed(BatchError::Cancelled { chunk_index });
        }
        if op.deadline_passed() {
            return Phase::Failed(BatchError::DeadlineExceeded { chunk_index });
        }

        let dispatched = tokio::select! {
            biased;
            _ = op.cancel.cancelled() => {
                return Phase::Failed(BatchError::Cancelled { chunk_index });
            }
            _ = op.deadline_reached() => {
                return Phase::Failed(BatchError::DeadlineExceeded { chunk_index });
            }
            result = self.dispatcher.dispatch(op.station_id, op.party, op.kind, chunk) => result,
        };

        match dispatched {
            Ok(correlation_id) => {
                op.report.chunks_dispatched += 1;
                Phase::AwaitingResponse {
                    chunk_index,
                    expected_items: chunk.len(),
                    correlation_id,
                }
            }
            Err(source) => Phase::Failed(BatchError::Dispatch {
                chunk_index,
                source,
            }),
        }
    }

    async fn await_response<'a>(
        &self,
        op: &Operation<'a>,
        chunk_index: usize,
        expected_items: usize,
        correlation_id: CorrelationId,
    ) -> Phase<'a> {
        let timeout = op.wait_budget(self.config.response_timeout);

        let received = tokio::select! {
            biased;
            _ = op.cancel.cancelled() => {
                return Phase::Failed(BatchError::Cancelled { chunk_index });
            }
            result = self.aggregator.await_response(&correlation_id, op.kind, timeout) => result,
        };

        match received {
            Ok(result) => Phase::Folding {
                chunk_index,
                expected_items,
                result,
            },
            Err(ResponseError::Timeout(timeout)) => Phase::Failed(BatchError::ResponseTimeout {
                chunk_index,
                correlation_id,
                timeout,
            }),
            Err(ResponseError::Missing(reason)) => Phase::Failed(BatchError::ResponseMissing {
                chunk_index,
                correlation_id,
                reason,
            }),
            Err(ResponseError::Store(source)) => Phase::Failed(BatchError::CorrelationStore {
                chunk_index,
                source,
            }),
        }
    }

    fn fold<'a>(
        op: &mut Operation<'a>,
        chunk_index: usize,
        expected_items: usize,
        result: ChunkResult,
    ) -> Phase<'a> {
        if result.len() != expected_items {
            warn!(
                "Chunk {chunk_index} on station {} sent {expected_items} items but got {} results",
                op.station_id,
                result.len()
            );
        }
        op.report.outcome.absorb(&result);
        op.report.results.extend(result.results);
        op.next_phase(chunk_index + 1)
    }
}
