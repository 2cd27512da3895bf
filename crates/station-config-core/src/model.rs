// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Domain types shared by every stage of a batched configuration command.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the charging station a command is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tenant (session party) on whose behalf requests are sent to a station.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionParty(String);

impl SessionParty {
    pub fn new(party: impl Into<String>) -> Self {
        Self(party.into())
    }
}

impl fmt::Display for SessionParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration command families that are subject to an items-per-message cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    SetVariables,
    GetVariables,
}

impl CommandKind {
    /// Variable instance qualifying the `ItemsPerMessage` limit for this command.
    pub fn limit_instance(self) -> &'static str {
        match self {
            Self::SetVariables => "SetVariables",
            Self::GetVariables => "GetVariables",
        }
    }

    /// Action name used on the wire.
    pub fn action(self) -> &'static str {
        match self {
            Self::SetVariables => "SetVariables",
            Self::GetVariables => "GetVariables",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// Device model attribute flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttributeType {
    #[default]
    Actual,
    Target,
    MinSet,
    MaxSet,
}

/// EVSE (and optionally connector) a component is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evse {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evse: Option<Evse>,
}

impl Component {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
            evse: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl Variable {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
        }
    }
}

/// One component/variable the caller wants to write (or read) on a station.
///
/// `value` is required for [`CommandKind::SetVariables`] and ignored for
/// [`CommandKind::GetVariables`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItem {
    pub component: Component,
    pub variable: Variable,
    #[serde(default)]
    pub attribute_type: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ConfigurationItem {
    /// Builds an item that sets `value` on the `Actual` attribute.
    pub fn set(component: Component, variable: Variable, value: impl Into<String>) -> Self {
        Self {
            component,
            variable,
            attribute_type: AttributeType::Actual,
            value: Some(value.into()),
        }
    }

    /// Builds an item that reads the `Actual` attribute.
    pub fn get(component: Component, variable: Variable) -> Self {
        Self {
            component,
            variable,
            attribute_type: AttributeType::Actual,
            value: None,
        }
    }
}

/// Per-item status reported by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Accepted,
    Rejected,
    RebootRequired,
    UnknownComponent,
    UnknownVariable,
    NotSupportedAttributeType,
    /// Any device-defined terminal status outside the ones above.
    #[serde(other)]
    Other,
}

/// Optional reason attached to an item status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub reason_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// Outcome of one item within a chunk response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub component: Component,
    pub variable: Variable,
    pub attribute_type: AttributeType,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_info: Option<StatusInfo>,
}

/// Decoded response of a single chunk, in the order the station reported it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkResult {
    pub results: Vec<ItemResult>,
}

impl ChunkResult {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Operation-wide flags folded across every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutcome {
    pub any_rejected: bool,
    pub any_reboot_required: bool,
}

/// Everything a finished operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub outcome: AggregateOutcome,
    /// Number of chunks handed to the transport.
    pub chunks_dispatched: usize,
    /// Item results of every chunk, concatenated in dispatch order.
    pub results: Vec<ItemResult>,
}
