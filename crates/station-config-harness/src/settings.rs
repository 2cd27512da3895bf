// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Harness-only settings: which station to simulate and what to send it.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use station_config_core::{CommandKind, ConfigurationItem, SessionParty, StationId};

const ENV_ITEMS_FILE: &str = "STATION_CONFIG_ITEMS_FILE";
const ENV_STATION_ID: &str = "STATION_CONFIG_STATION_ID";
const ENV_PARTY: &str = "STATION_CONFIG_PARTY";
const ENV_ITEMS_PER_MESSAGE: &str = "STATION_CONFIG_ITEMS_PER_MESSAGE";
const ENV_COMMAND: &str = "STATION_CONFIG_COMMAND";
const ENV_SIM_LATENCY_MS: &str = "STATION_CONFIG_SIM_LATENCY_MS";

const DEFAULT_STATION_ID: &str = "cs-001";
const DEFAULT_PARTY: &str = "local";
const DEFAULT_SIM_LATENCY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSettings {
    pub items_file: PathBuf,
    pub station_id: StationId,
    pub party: SessionParty,
    /// Limit seeded into the attribute store; `None` leaves the station unlimited
    pub items_per_message: Option<usize>,
    pub command: CommandKind,
    /// Delay before the simulated station stores a response
    pub sim_latency: Duration,
}

impl HarnessSettings {
    /// Reads settings from the process environment. A first command line
    /// argument overrides the items file.
    pub fn from_env() -> Result<Self> {
        let mut vars: HashMap<String, String> = env::vars().collect();
        if let Some(path) = env::args().nth(1) {
            vars.insert(ENV_ITEMS_FILE.to_string(), path);
        }
        Self::from_env_iter(vars)
    }

    pub fn from_env_iter<I, K, V>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| {
            map.get(key)
                .map(|val| val.trim())
                .filter(|val| !val.is_empty())
        };

        let items_file = get(ENV_ITEMS_FILE)
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("{ENV_ITEMS_FILE} is not set and no items file was given"))?;
        let station_id = StationId::new(get(ENV_STATION_ID).unwrap_or(DEFAULT_STATION_ID));
        let party = SessionParty::new(get(ENV_PARTY).unwrap_or(DEFAULT_PARTY));

        let items_per_message = match get(ENV_ITEMS_PER_MESSAGE) {
            None => None,
            Some(raw) => {
                let limit: usize = raw
                    .parse()
                    .with_context(|| format!("{ENV_ITEMS_PER_MESSAGE} must be an integer"))?;
                if limit == 0 {
                    bail!("{ENV_ITEMS_PER_MESSAGE} must be greater than 0");
                }
                Some(limit)
            }
        };

        let command = match get(ENV_COMMAND).map(str::to_lowercase).as_deref() {
            None | Some("set") => CommandKind::SetVariables,
            Some("get") => CommandKind::GetVariables,
            Some(other) => bail!("{ENV_COMMAND} must be 'set' or 'get', got '{other}'"),
        };

        let sim_latency = match get(ENV_SIM_LATENCY_MS) {
            None => DEFAULT_SIM_LATENCY,
            Some(raw) => Duration::from_millis(
                raw.parse()
                    .with_context(|| format!("{ENV_SIM_LATENCY_MS} must be an integer"))?,
            ),
        };

        Ok(Self {
            items_file,
            station_id,
            party,
            items_per_message,
            command,
            sim_latency,
        })
    }
}

/// Loads a JSON array of configuration items.
pub fn load_items(path: &Path) -> Result<Vec<ConfigurationItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read items file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("items file {} is not a JSON item list", path.display()))
}
