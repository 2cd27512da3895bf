// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Environment-driven engine configuration.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

const ENV_RESPONSE_TIMEOUT_SECS: &str = "STATION_CONFIG_RESPONSE_TIMEOUT_SECS";
const ENV_OPERATION_DEADLINE_SECS: &str = "STATION_CONFIG_OPERATION_DEADLINE_SECS";
const ENV_CORRELATION_TTL_SECS: &str = "STATION_CONFIG_CORRELATION_TTL_SECS";
const ENV_POLL_INTERVAL_MS: &str = "STATION_CONFIG_POLL_INTERVAL_MS";
const ENV_LOG_LEVEL: &str = "STATION_CONFIG_LOG_LEVEL";

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CORRELATION_TTL: Duration = Duration::from_secs(120);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings of the batch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum wait for a single chunk's response
    pub response_timeout: Duration,
    /// Optional bound on a whole operation, across all chunks
    pub operation_deadline: Option<Duration>,
    /// How long uncollected responses stay in the in-memory correlation store
    pub correlation_ttl: Duration,
    /// Polling cadence for correlation stores that cannot signal arrivals
    pub poll_interval: Duration,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            operation_deadline: None,
            correlation_ttl: DEFAULT_CORRELATION_TTL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, EngineConfigError> {
        Self::from_env_iter(env::vars())
    }

    /// Create configuration from key/value pairs (typically for tests)
    pub fn from_env_iter<I, K, V>(iter: I) -> Result<Self, EngineConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let defaults = Self::default();

        let response_timeout = parse_u64(&map, ENV_RESPONSE_TIMEOUT_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.response_timeout);
        let operation_deadline =
            parse_u64(&map, ENV_OPERATION_DEADLINE_SECS)?.map(Duration::from_secs);
        let correlation_ttl = parse_u64(&map, ENV_CORRELATION_TTL_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.correlation_ttl);
        let poll_interval = parse_u64(&map, ENV_POLL_INTERVAL_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        let log_level = map
            .get(ENV_LOG_LEVEL)
            .map(|val| val.trim().to_lowercase())
            .filter(|val| !val.is_empty())
            .unwrap_or(defaults.log_level);

        let config = Self {
            response_timeout,
            operation_deadline,
            correlation_ttl,
            poll_interval,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.response_timeout.is_zero() {
            return Err(EngineConfigError::Invalid(
                "response timeout must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(EngineConfigError::Invalid(
                "poll interval must be greater than 0".to_string(),
            ));
        }

        if self.correlation_ttl < self.response_timeout {
            return Err(EngineConfigError::Invalid(format!(
                "correlation TTL ({:?}) must not be shorter than the response timeout ({:?})",
                self.correlation_ttl, self.response_timeout
            )));
        }

        if self.operation_deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(EngineConfigError::Invalid(
                "operation deadline must be greater than 0 when set".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(EngineConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

fn parse_u64(map: &HashMap<String, String>, key: &str) -> Result<Option<u64>, EngineConfigError> {
    match map.get(key).map(|val| val.trim()).filter(|val| !val.is_empty()) {
        None => Ok(None),
        Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
            EngineConfigError::Invalid(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
    }
}
