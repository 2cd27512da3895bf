// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-process station that answers variable requests from a local device
//! model and stores its responses in the correlation store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use station_config_core::messages::{
    GetVariableResult, GetVariablesRequest, GetVariablesResponse, SetVariableResult,
    SetVariablesRequest, SetVariablesResponse,
};
use station_config_core::{
    CommandKind, Component, CorrelationId, CorrelationStore, ItemStatus, OutboundRequest,
    StationId, Transport, TransportError, Variable,
};
use tracing::{debug, warn};

/// Variables whose change only takes effect after a reboot.
const REBOOT_VARIABLES: [&str; 2] = ["NetworkConfigurationPriority", "SecurityProfile"];

type VariableKey = (Component, Variable);

pub struct SimulatedStation {
    station_id: StationId,
    store: Arc<dyn CorrelationStore>,
    items_per_message: Option<usize>,
    latency: Duration,
    variables: Mutex<HashMap<VariableKey, String>>,
}

impl SimulatedStation {
    pub fn new(
        station_id: StationId,
        store: Arc<dyn CorrelationStore>,
        items_per_message: Option<usize>,
        latency: Duration,
    ) -> Self {
        Self {
            station_id,
            store,
            items_per_message,
            latency,
            variables: Mutex::new(HashMap::new()),
        }
    }

    fn with_variables<R>(&self, f: impl FnOnce(&mut HashMap<VariableKey, String>) -> R) -> R {
        match self.variables.lock() {
            Ok(mut variables) => f(&mut variables),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn too_many(&self, count: usize) -> Option<Value> {
        let limit = self.items_per_message?;
        (count > limit).then(|| {
            json!({
                "errorCode": "OccurrenceConstraintViolation",
                "errorDescription": format!("{count} items exceed ItemsPerMessage {limit}"),
            })
        })
    }

    fn answer_set(&self, request: SetVariablesRequest) -> serde_json::Result<Value> {
        if let Some(call_error) = self.too_many(request.set_variable_data.len()) {
            return Ok(call_error);
        }
        let results = self.with_variables(|variables| {
            request
                .set_variable_data
                .into_iter()
                .map(|data| {
                    let status = if data.attribute_value.is_empty() {
                        ItemStatus::Rejected
                    } else if REBOOT_VARIABLES.contains(&data.variable.name.as_str()) {
                        ItemStatus::RebootRequired
                    } else {
                        ItemStatus::Accepted
                    };
                    if status != ItemStatus::Rejected {
                        variables.insert(
                            (data.component.clone(), data.variable.clone()),
                            data.attribute_value,
                        );
                    }
                    SetVariableResult {
                        attribute_type: data.attribute_type,
                        attribute_status: status,
                        attribute_status_info: None,
                        component: data.component,
                        variable: data.variable,
                    }
                })
                .collect()
        });
        serde_json::to_value(SetVariablesResponse {
            set_variable_result: results,
        })
    }

    fn answer_get(&self, request: GetVariablesRequest) -> serde_json::Result<Value> {
        if let Some(call_error) = self.too_many(request.get_variable_data.len()) {
            return Ok(call_error);
        }
        let results = self.with_variables(|variables| {
            request
                .get_variable_data
                .into_iter()
                .map(|data| {
                    let value = variables
                        .get(&(data.component.clone(), data.variable.clone()))
                        .cloned();
                    GetVariableResult {
                        attribute_status: if value.is_some() {
                            ItemStatus::Accepted
                        } else {
                            ItemStatus::UnknownVariable
                        },
                        attribute_status_info: None,
                        attribute_type: data.attribute_type,
                        attribute_value: value,
                        component: data.component,
                        variable: data.variable,
                    }
                })
                .collect()
        });
        serde_json::to_value(GetVariablesResponse {
            get_variable_result: results,
        })
    }

    fn answer(&self, request: &OutboundRequest) -> Result<Value, TransportError> {
        let payload = request.payload.clone();
        let answer = match request.kind {
            CommandKind::SetVariables => {
                serde_json::from_value(payload).and_then(|request| self.answer_set(request))
            }
            CommandKind::GetVariables => {
                serde_json::from_value(payload).and_then(|request| self.answer_get(request))
            }
        };
        answer.map_err(|err| TransportError::Rejected(format!("unreadable request: {err}")))
    }

    fn store_later(&self, correlation_id: CorrelationId, payload: String) {
        let store = Arc::clone(&self.store);
        let latency = self.latency;
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            if let Err(err) = store.put(correlation_id, payload).await {
                warn!("Simulated station could not store response {correlation_id}: {err}");
            }
        });
    }
}

#[async_trait]
impl Transport for SimulatedStation {
    async fn send_async_request(&self, request: OutboundRequest) -> Result<(), TransportError> {
        if request.station_id != self.station_id {
            return Err(TransportError::NotConnected(request.station_id));
        }
        let answer = self.answer(&request)?;
        debug!(
            "Simulated station {} answers {} {}",
            self.station_id, request.kind, request.correlation_id
        );
        self.store_later(request.correlation_id, answer.to_string());
        Ok(())
    }
}
