// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Device model attribute access and items-per-message limit discovery.
//!
//! Stations report how many items they accept per message through the
//! `DeviceDataCtrlr.ItemsPerMessage` variable, one instance per command kind.
//! The limit is looked up on every operation since a station may change it
//! between operations.

use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::model::{AttributeType, CommandKind, StationId};
use crate::planner::ItemLimit;

/// Component owning the items-per-message variables.
pub const ITEM_LIMIT_COMPONENT: &str = "DeviceDataCtrlr";
/// Variable carrying the items-per-message limit.
pub const ITEM_LIMIT_VARIABLE: &str = "ItemsPerMessage";

/// Filter passed to [`AttributeStore::read_all_by_query`]. `None` fields match
/// any value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeQuery {
    pub station_id: StationId,
    pub component_name: String,
    pub variable_name: String,
    pub variable_instance: Option<String>,
    pub attribute_type: Option<AttributeType>,
}

/// One stored device model attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub station_id: StationId,
    pub component_name: String,
    pub variable_name: String,
    pub variable_instance: Option<String>,
    pub attribute_type: AttributeType,
    pub value: Option<String>,
}

impl AttributeRecord {
    /// Builds the `Actual` attribute record advertising an items-per-message limit.
    pub fn item_limit(station_id: StationId, kind: CommandKind, value: impl Into<String>) -> Self {
        Self {
            station_id,
            component_name: ITEM_LIMIT_COMPONENT.to_string(),
            variable_name: ITEM_LIMIT_VARIABLE.to_string(),
            variable_instance: Some(kind.limit_instance().to_string()),
            attribute_type: AttributeType::Actual,
            value: Some(value.into()),
        }
    }

    fn matches(&self, query: &AttributeQuery) -> bool {
        self.station_id == query.station_id
            && self.component_name == query.component_name
            && self.variable_name == query.variable_name
            && query
                .variable_instance
                .as_ref()
                .map_or(true, |instance| self.variable_instance.as_ref() == Some(instance))
            && query
                .attribute_type
                .map_or(true, |attribute_type| self.attribute_type == attribute_type)
    }
}

#[derive(Debug, Error)]
pub enum AttributeStoreError {
    #[error("attribute store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to persisted device model attributes.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    async fn read_all_by_query(
        &self,
        query: &AttributeQuery,
    ) -> Result<Vec<AttributeRecord>, AttributeStoreError>;
}

/// Process-local [`AttributeStore`] backed by a vector of records.
#[derive(Debug, Default)]
pub struct InMemoryAttributeStore {
    records: RwLock<Vec<AttributeRecord>>,
}

impl InMemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<AttributeRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn insert(&self, record: AttributeRecord) {
        match self.records.write() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    /// Drops every record of `station_id`.
    pub fn remove_station(&self, station_id: &StationId) {
        let keep = |record: &AttributeRecord| &record.station_id != station_id;
        match self.records.write() {
            Ok(mut records) => records.retain(keep),
            Err(poisoned) => poisoned.into_inner().retain(keep),
        }
    }
}

#[async_trait]
impl AttributeStore for InMemoryAttributeStore {
    async fn read_all_by_query(
        &self,
        query: &AttributeQuery,
    ) -> Result<Vec<AttributeRecord>, AttributeStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| AttributeStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(records
            .iter()
            .filter(|record| record.matches(query))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    /// More than one limit exists for the same station and command kind.
    #[error("found {count} ItemsPerMessage records where at most one may exist")]
    Consistency { count: usize },
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Store(#[from] AttributeStoreError),
}

/// Resolves the items-per-message limit of a station for a command kind.
#[derive(Clone)]
pub struct ItemLimitLookup {
    store: Arc<dyn AttributeStore>,
}

impl ItemLimitLookup {
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self { store }
    }

    pub async fn limit_for(
        &self,
        station_id: &StationId,
        kind: CommandKind,
    ) -> Result<ItemLimit, LookupError> {
        let query = AttributeQuery {
            station_id: station_id.clone(),
            component_name: ITEM_LIMIT_COMPONENT.to_string(),
            variable_name: ITEM_LIMIT_VARIABLE.to_string(),
            variable_instance: Some(kind.limit_instance().to_string()),
            attribute_type: Some(AttributeType::Actual),
        };
        let records = self.store.read_all_by_query(&query).await?;

        match records.as_slice() {
            [] => {
                debug!("No {ITEM_LIMIT_VARIABLE} limit for {kind} on station {station_id}");
                Ok(ItemLimit::Unlimited)
            }
            [record] => {
                let limit = parse_limit(record.value.as_deref())?;
                debug!("Station {station_id} accepts {limit} items per {kind} message");
                Ok(ItemLimit::PerMessage(limit))
            }
            many => Err(LookupError::Consistency { count: many.len() }),
        }
    }
}

fn parse_limit(value: Option<&str>) -> Result<NonZeroUsize, LookupError> {
    let raw = value.ok_or_else(|| {
        LookupError::Configuration(format!("{ITEM_LIMIT_VARIABLE} attribute has no value"))
    })?;
    let trimmed = raw.trim();
    let parsed: i64 = trimmed.parse().map_err(|_| {
        LookupError::Configuration(format!(
            "{ITEM_LIMIT_VARIABLE} value '{raw}' is not an integer"
        ))
    })?;
    usize::try_from(parsed)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LookupError::Configuration(format!(
                "{ITEM_LIMIT_VARIABLE} value {parsed} must be positive"
            ))
        })
}
