// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::correlation::CorrelationId;
use crate::messages::{encode_request, PayloadError};
use crate::model::{CommandKind, ConfigurationItem, SessionParty, StationId};
use crate::transport::{OutboundRequest, Transport, TransportError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to encode request: {0}")]
    Encode(#[from] PayloadError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Sends one chunk as a fire-and-track request.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Encodes `chunk`, tags it with a fresh [`CorrelationId`] and hands it to
    /// the transport. Returns as soon as the transport accepted the message.
    pub async fn dispatch(
        &self,
        station_id: &StationId,
        party: &SessionParty,
        kind: CommandKind,
        chunk: &[ConfigurationItem],
    ) -> Result<CorrelationId, DispatchError> {
        let payload = encode_request(kind, chunk)?;
        let correlation_id = CorrelationId::new();

        self.transport
            .send_async_request(OutboundRequest {
                station_id: station_id.clone(),
                party: party.clone(),
                kind,
                correlation_id,
                payload,
            })
            .await?;

        debug!(
            "Dispatched {kind} with {} items to station {station_id} as {correlation_id}",
            chunk.len()
        );
        Ok(correlation_id)
    }
}
