// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock station transport for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use station_config_core::{
    CommandKind, CorrelationStore, InMemoryCorrelationStore, ItemStatus, OutboundRequest,
    Transport, TransportError,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock station reacts to one dispatched chunk.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Every item is accepted except the listed `(item index, status)` overrides.
    Statuses(Vec<(usize, ItemStatus)>),
    /// Stores the given payload verbatim.
    Raw(String),
    /// Accepts the request but never answers.
    Silent,
    /// The transport refuses the request.
    Offline,
}

impl Reply {
    pub fn accept_all() -> Self {
        Reply::Statuses(Vec::new())
    }
}

/// Station that answers requests according to a script, one entry per
/// dispatched chunk. Once the script runs out every item is accepted.
pub struct ScriptedStation {
    store: Arc<InMemoryCorrelationStore>,
    script: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<OutboundRequest>>,
    latency: Duration,
    send_delay: Duration,
}

impl ScriptedStation {
    pub fn new(store: Arc<InMemoryCorrelationStore>) -> Self {
        ScriptedStation {
            store,
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            send_delay: Duration::ZERO,
        }
    }

    pub fn with_script(self, replies: Vec<Reply>) -> Self {
        *self.script.lock().unwrap() = replies.into();
        self
    }

    /// Delay between accepting a request and storing its response.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Time the transport takes before `send_async_request` returns.
    pub fn with_send_delay(mut self, send_delay: Duration) -> Self {
        self.send_delay = send_delay;
        self
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Number of items carried by each dispatched request, in order.
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.sent()
            .iter()
            .map(|request| request_items(request).len())
            .collect()
    }
}

fn request_items(request: &OutboundRequest) -> Vec<Value> {
    let key = match request.kind {
        CommandKind::SetVariables => "setVariableData",
        CommandKind::GetVariables => "getVariableData",
    };
    request.payload[key].as_array().cloned().unwrap_or_default()
}

fn status_name(status: ItemStatus) -> Value {
    serde_json::to_value(status).unwrap()
}

fn render_response(request: &OutboundRequest, overrides: &[(usize, ItemStatus)]) -> String {
    let results: Vec<Value> = request_items(request)
        .iter()
        .enumerate()
        .map(|(index, data)| {
            let status = overrides
                .iter()
                .find(|(item, _)| *item == index)
                .map(|(_, status)| *status)
                .unwrap_or(ItemStatus::Accepted);
            let mut result = json!({
                "attributeStatus": status_name(status),
                "attributeType": data["attributeType"],
                "component": data["component"],
                "variable": data["variable"],
            });
            if request.kind == CommandKind::GetVariables && status == ItemStatus::Accepted {
                result["attributeValue"] =
                    json!(format!("value-of-{}", data["variable"]["name"].as_str().unwrap()));
            }
            result
        })
        .collect();

    match request.kind {
        CommandKind::SetVariables => json!({ "setVariableResult": results }).to_string(),
        CommandKind::GetVariables => json!({ "getVariableResult": results }).to_string(),
    }
}

#[async_trait]
impl Transport for ScriptedStation {
    async fn send_async_request(&self, request: OutboundRequest) -> Result<(), TransportError> {
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Reply::accept_all);

        let payload = match reply {
            Reply::Offline => return Err(TransportError::NotConnected(request.station_id)),
            Reply::Statuses(overrides) => Some(render_response(&request, &overrides)),
            Reply::Raw(payload) => Some(payload),
            Reply::Silent => None,
        };
        let correlation_id = request.correlation_id;
        self.sent.lock().unwrap().push(request);

        if let Some(payload) = payload {
            if self.latency.is_zero() {
                self.store.put(correlation_id, payload).await.unwrap();
            } else {
                let store = Arc::clone(&self.store);
                let latency = self.latency;
                tokio::spawn(async move {
                    tokio::time::sleep(latency).await;
                    let _ = store.put(correlation_id, payload).await;
                });
            }
        }

        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        Ok(())
    }
}
