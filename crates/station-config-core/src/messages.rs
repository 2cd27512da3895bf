// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! JSON payloads exchanged with stations for the variable commands.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    AttributeType, CommandKind, Component, ConfigurationItem, ItemResult, ItemStatus, StatusInfo,
    Variable,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<AttributeType>,
    pub attribute_value: String,
    pub component: Component,
    pub variable: Variable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetVariablesRequest {
    pub set_variable_data: Vec<SetVariableData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetVariableData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<AttributeType>,
    pub component: Component,
    pub variable: Variable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetVariablesRequest {
    pub get_variable_data: Vec<GetVariableData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<AttributeType>,
    pub attribute_status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_status_info: Option<StatusInfo>,
    pub component: Component,
    pub variable: Variable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetVariablesResponse {
    pub set_variable_result: Vec<SetVariableResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetVariableResult {
    pub attribute_status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_status_info: Option<StatusInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<AttributeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_value: Option<String>,
    pub component: Component,
    pub variable: Variable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetVariablesResponse {
    pub get_variable_result: Vec<GetVariableResult>,
}

/// Error answer a station sends in place of a result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallError {
    pub error_code: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("item {index} ({component}.{variable}) has no value to set")]
    MissingValue {
        index: usize,
        component: String,
        variable: String,
    },
    #[error("empty payload")]
    Empty,
    #[error("station answered with call error {code}{}", describe(.description))]
    CallError {
        code: String,
        description: Option<String>,
    },
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|description| format!(": {description}"))
        .unwrap_or_default()
}

/// Checks that every item carries what `kind` needs.
pub fn validate_items(kind: CommandKind, items: &[ConfigurationItem]) -> Result<(), PayloadError> {
    if kind != CommandKind::SetVariables {
        return Ok(());
    }
    match items.iter().position(|item| item.value.is_none()) {
        Some(index) => Err(PayloadError::MissingValue {
            index,
            component: items[index].component.name.clone(),
            variable: items[index].variable.name.clone(),
        }),
        None => Ok(()),
    }
}

/// Builds the request payload for one chunk.
pub fn encode_request(
    kind: CommandKind,
    chunk: &[ConfigurationItem],
) -> Result<serde_json::Value, PayloadError> {
    validate_items(kind, chunk)?;
    let value = match kind {
        CommandKind::SetVariables => serde_json::to_value(SetVariablesRequest {
            set_variable_data: chunk
                .iter()
                .map(|item| SetVariableData {
                    attribute_type: Some(item.attribute_type),
                    attribute_value: item.value.clone().unwrap_or_default(),
                    component: item.component.clone(),
                    variable: item.variable.clone(),
                })
                .collect(),
        })?,
        CommandKind::GetVariables => serde_json::to_value(GetVariablesRequest {
            get_variable_data: chunk
                .iter()
                .map(|item| GetVariableData {
                    attribute_type: Some(item.attribute_type),
                    component: item.component.clone(),
                    variable: item.variable.clone(),
                })
                .collect(),
        })?,
    };
    Ok(value)
}

/// Decodes the per-item results of a response payload.
///
/// A present-but-empty payload is an error; callers distinguish "not arrived"
/// through the correlation store, never through this function.
pub fn decode_response(kind: CommandKind, payload: &str) -> Result<Vec<ItemResult>, PayloadError> {
    if payload.trim().is_empty() {
        return Err(PayloadError::Empty);
    }
    let value: serde_json::Value = serde_json::from_str(payload)?;
    if value.get("errorCode").is_some() {
        let call_error: CallError = serde_json::from_value(value)?;
        return Err(PayloadError::CallError {
            code: call_error.error_code,
            description: call_error.error_description,
        });
    }

    let results = match kind {
        CommandKind::SetVariables => {
            let response: SetVariablesResponse = serde_json::from_value(value)?;
            response
                .set_variable_result
                .into_iter()
                .map(|result| ItemResult {
                    component: result.component,
                    variable: result.variable,
                    attribute_type: result.attribute_type.unwrap_or_default(),
                    status: result.attribute_status,
                    value: None,
                    status_info: result.attribute_status_info,
                })
                .collect()
        }
        CommandKind::GetVariables => {
            let response: GetVariablesResponse = serde_json::from_value(value)?;
            response
                .get_variable_result
                .into_iter()
                .map(|result| ItemResult {
                    component: result.component,
                    variable: result.variable,
                    attribute_type: result.attribute_type.unwrap_or_default(),
                    status: result.attribute_status,
                    value: result.attribute_value,
                    status_info: result.attribute_status_info,
                })
                .collect()
        }
    };
    Ok(results)
}
