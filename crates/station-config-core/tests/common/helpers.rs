// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

#![allow(dead_code)]

use super::mocks::ScriptedStation;
use station_config_core::{
    AttributeRecord, BatchOrchestrator, CommandKind, Component, ConfigurationItem, EngineConfig,
    InMemoryAttributeStore, InMemoryCorrelationStore, SessionParty, StationId, Variable,
};
use std::sync::Arc;

pub const STATION: &str = "cs-001";

pub fn station() -> StationId {
    StationId::new(STATION)
}

pub fn party() -> SessionParty {
    SessionParty::new("tenant-1")
}

pub fn set_items(count: usize) -> Vec<ConfigurationItem> {
    (0..count)
        .map(|i| {
            ConfigurationItem::set(
                Component::named("OCPPCommCtrlr"),
                Variable::named(format!("Setting{i}")),
                format!("{i}"),
            )
        })
        .collect()
}

pub fn get_items(count: usize) -> Vec<ConfigurationItem> {
    (0..count)
        .map(|i| {
            ConfigurationItem::get(
                Component::named("OCPPCommCtrlr"),
                Variable::named(format!("Setting{i}")),
            )
        })
        .collect()
}

/// Orchestrator wired to in-memory stores and a scripted station.
pub struct Harness {
    pub orchestrator: BatchOrchestrator,
    pub station: Arc<ScriptedStation>,
    pub correlation_store: Arc<InMemoryCorrelationStore>,
    pub attributes: Arc<InMemoryAttributeStore>,
}

impl Harness {
    /// Builds a harness whose station advertises `limit` items per
    /// SetVariables and GetVariables message (`None` advertises nothing).
    pub fn new(
        limit: Option<&str>,
        config: EngineConfig,
        script: impl FnOnce(ScriptedStation) -> ScriptedStation,
    ) -> Self {
        let attributes = Arc::new(InMemoryAttributeStore::new());
        if let Some(limit) = limit {
            for kind in [CommandKind::SetVariables, CommandKind::GetVariables] {
                attributes.insert(AttributeRecord::item_limit(station(), kind, limit));
            }
        }
        let correlation_store = Arc::new(InMemoryCorrelationStore::new(config.correlation_ttl));
        let station = Arc::new(script(ScriptedStation::new(Arc::clone(&correlation_store))));
        let orchestrator = BatchOrchestrator::new(
            attributes.clone(),
            station.clone(),
            correlation_store.clone(),
            config,
        );

        Harness {
            orchestrator,
            station,
            correlation_store,
            attributes,
        }
    }
}
