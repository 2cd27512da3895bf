// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use thiserror::Error;

use crate::correlation::CorrelationId;
use crate::model::{CommandKind, SessionParty, StationId};

/// A request handed to the transport. The station's answer comes back later
/// through the correlation store under `correlation_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub station_id: StationId,
    pub party: SessionParty,
    pub kind: CommandKind,
    pub correlation_id: CorrelationId,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("station {0} is not connected")]
    NotConnected(StationId),
    #[error("transport rejected the request: {0}")]
    Rejected(String),
}

/// Outbound side of the station message exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hands `request` to the transport. Success means the message was
    /// accepted for delivery, not that the station answered.
    async fn send_async_request(&self, request: OutboundRequest) -> Result<(), TransportError>;
}
