// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use crate::attributes::{AttributeStoreError, LookupError};
use crate::correlation::{CorrelationId, CorrelationStoreError};
use crate::dispatcher::DispatchError;
use crate::model::{CommandKind, StationId};

/// Discriminant of a [`BatchError`], convenient for callers that branch on
/// the failure class without matching on every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Consistency,
    Configuration,
    Dispatch,
    ResponseTimeout,
    ResponseMissing,
    AttributeStore,
    CorrelationStore,
    Cancelled,
}

/// Errors that abort a batched configuration command.
///
/// None of these are retried internally. Chunks dispatched before the failure
/// may already be applied on the station.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("station {station_id} reports {count} ItemsPerMessage limits for {kind}")]
    Consistency {
        station_id: StationId,
        kind: CommandKind,
        count: usize,
    },

    #[error("invalid configuration for {kind} on station {station_id}: {reason}")]
    Configuration {
        station_id: StationId,
        kind: CommandKind,
        reason: String,
    },

    #[error("failed to dispatch chunk {chunk_index}: {source}")]
    Dispatch {
        chunk_index: usize,
        #[source]
        source: DispatchError,
    },

    #[error("no response for chunk {chunk_index} ({correlation_id}) within {timeout:?}")]
    ResponseTimeout {
        chunk_index: usize,
        correlation_id: CorrelationId,
        timeout: Duration,
    },

    #[error("unusable response for chunk {chunk_index} ({correlation_id}): {reason}")]
    ResponseMissing {
        chunk_index: usize,
        correlation_id: CorrelationId,
        reason: String,
    },

    #[error("operation deadline exceeded before chunk {chunk_index} was handed to the transport")]
    DeadlineExceeded { chunk_index: usize },

    #[error("attribute store failure: {0}")]
    AttributeStore(#[from] AttributeStoreError),

    #[error("correlation store failure on chunk {chunk_index}: {source}")]
    CorrelationStore {
        chunk_index: usize,
        #[source]
        source: CorrelationStoreError,
    },

    #[error("operation cancelled at chunk {chunk_index}")]
    Cancelled { chunk_index: usize },
}

impl BatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Consistency { .. } => ErrorKind::Consistency,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Dispatch { .. } => ErrorKind::Dispatch,
            Self::ResponseTimeout { .. } | Self::DeadlineExceeded { .. } => {
                ErrorKind::ResponseTimeout
            }
            Self::ResponseMissing { .. } => ErrorKind::ResponseMissing,
            Self::AttributeStore(_) => ErrorKind::AttributeStore,
            Self::CorrelationStore { .. } => ErrorKind::CorrelationStore,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Index (0-based) of the chunk in flight when the operation failed.
    /// Failures raised while planning carry no index.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            Self::Dispatch { chunk_index, .. }
            | Self::ResponseTimeout { chunk_index, .. }
            | Self::ResponseMissing { chunk_index, .. }
            | Self::DeadlineExceeded { chunk_index }
            | Self::CorrelationStore { chunk_index, .. }
            | Self::Cancelled { chunk_index } => Some(*chunk_index),
            Self::Consistency { .. } | Self::Configuration { .. } | Self::AttributeStore(_) => {
                None
            }
        }
    }

    pub(crate) fn from_lookup(station_id: &StationId, kind: CommandKind, err: LookupError) -> Self {
        match err {
            LookupError::Consistency { count } => Self::Consistency {
                station_id: station_id.clone(),
                kind,
                count,
            },
            LookupError::Configuration(reason) => Self::Configuration {
                station_id: station_id.clone(),
                kind,
                reason,
            },
            LookupError::Store(source) => Self::AttributeStore(source),
        }
    }
}
