// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod settings;
mod station;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use station_config_core::{
    AttributeRecord, BatchOrchestrator, BatchReport, CommandKind, EngineConfig,
    InMemoryAttributeStore, InMemoryCorrelationStore,
};

use settings::{load_items, HarnessSettings};
use station::SimulatedStation;

#[tokio::main]
pub async fn main() {
    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level)
                .expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let settings = match HarnessSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid harness settings: {e:#}");
            std::process::exit(2);
        }
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling operation");
            shutdown.cancel();
        }
    });

    match run(config, settings, &cancel).await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Unable to render report: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(
    config: EngineConfig,
    settings: HarnessSettings,
    cancel: &CancellationToken,
) -> Result<BatchReport> {
    let items = load_items(&settings.items_file)?;
    info!(
        "Loaded {} items from {}",
        items.len(),
        settings.items_file.display()
    );

    let attributes = Arc::new(InMemoryAttributeStore::new());
    if let Some(limit) = settings.items_per_message {
        for kind in [CommandKind::SetVariables, CommandKind::GetVariables] {
            attributes.insert(AttributeRecord::item_limit(
                settings.station_id.clone(),
                kind,
                limit.to_string(),
            ));
        }
    }

    let correlation_store = Arc::new(InMemoryCorrelationStore::new(config.correlation_ttl));
    let station = Arc::new(SimulatedStation::new(
        settings.station_id.clone(),
        correlation_store.clone(),
        settings.items_per_message,
        settings.sim_latency,
    ));
    let orchestrator = BatchOrchestrator::new(attributes, station, correlation_store, config);

    orchestrator
        .run_batched_command_report(
            &settings.station_id,
            &settings.party,
            settings.command,
            &items,
            cancel,
        )
        .await
        .with_context(|| format!("{} on station {} failed", settings.command, settings.station_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;
    use station_config_core::{SessionParty, StationId};

    fn settings(items_file: PathBuf, command: CommandKind) -> HarnessSettings {
        HarnessSettings {
            items_file,
            station_id: StationId::new("cs-001"),
            party: SessionParty::new("local"),
            items_per_message: Some(2),
            command,
            sim_latency: Duration::from_millis(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_applies_items_file() {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
        write!(
            file,
            r#"[
                {{"component": {{"name": "OCPPCommCtrlr"}}, "variable": {{"name": "HeartbeatInterval"}}, "value": "300"}},
                {{"component": {{"name": "OCPPCommCtrlr"}}, "variable": {{"name": "RetryBackOffWaitMinimum"}}, "value": "5"}},
                {{"component": {{"name": "SecurityCtrlr"}}, "variable": {{"name": "SecurityProfile"}}, "value": "2"}}
            ]"#
        )
        .expect("failed to write items");

        let report = run(
            EngineConfig::default(),
            settings(file.path().to_path_buf(), CommandKind::SetVariables),
            &CancellationToken::new(),
        )
        .await
        .expect("run failed");

        assert_eq!(report.chunks_dispatched, 2);
        assert_eq!(report.results.len(), 3);
        assert!(!report.outcome.any_rejected);
        assert!(report.outcome.any_reboot_required);

        let json = serde_json::to_value(&report).expect("report must serialize");
        assert_eq!(json["outcome"]["anyRebootRequired"], true);
        assert_eq!(json["chunksDispatched"], 2);
        assert_eq!(json["results"][2]["status"], "RebootRequired");
    }

    #[tokio::test]
    async fn test_run_reports_missing_items_file() {
        let err = run(
            EngineConfig::default(),
            settings(
                PathBuf::from("/nonexistent/items.json"),
                CommandKind::GetVariables,
            ),
            &CancellationToken::new(),
        )
        .await
        .expect_err("missing file must fail");
        assert!(format!("{err:#}").contains("failed to read items file"));
    }
}
