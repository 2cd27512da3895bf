// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Chunked dispatch of charging station configuration commands.
//!
//! A command carrying any number of configuration items is split according to
//! the station's reported items-per-message limit, each chunk is sent as an
//! asynchronous request tagged with a correlation id, and the matching
//! responses are collected from a correlation store and folded into one
//! [`AggregateOutcome`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod aggregator;
pub mod attributes;
pub mod config;
pub mod correlation;
pub mod dispatcher;
pub mod error;
pub mod messages;
pub mod model;
pub mod orchestrator;
pub mod planner;
pub mod transport;

pub use aggregator::{ResponseAggregator, ResponseError};
pub use attributes::{
    AttributeQuery, AttributeRecord, AttributeStore, AttributeStoreError, InMemoryAttributeStore,
    ItemLimitLookup, LookupError,
};
pub use config::{EngineConfig, EngineConfigError};
pub use correlation::{
    CorrelationId, CorrelationStore, CorrelationStoreError, InMemoryCorrelationStore,
};
pub use dispatcher::{DispatchError, Dispatcher};
pub use error::{BatchError, ErrorKind};
pub use model::{
    AggregateOutcome, AttributeType, BatchReport, ChunkResult, CommandKind, Component,
    ConfigurationItem, Evse, ItemResult, ItemStatus, SessionParty, StationId, StatusInfo,
    Variable,
};
pub use orchestrator::BatchOrchestrator;
pub use planner::{ChunkPlan, ItemLimit};
pub use transport::{OutboundRequest, Transport, TransportError};
