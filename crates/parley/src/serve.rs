// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Opens the session store, builds the event engine with the built-in
//! session middleware, starts the janitor, and feeds stdin lines into the
//! incoming pipeline as `text` events on the `cli` channel until a shutdown
//! signal arrives.

use std::sync::Arc;

use parley_config::ParleyConfig;
use parley_core::{DialogError, Direction, Event, SessionStore, SystemClock};
use parley_janitor::{DialogJanitor, TokioScheduler};
use parley_pipeline::EventEngine;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::middleware::{SessionActivity, SessionExpiry};
use crate::shutdown;

/// Channel stdin events are attributed to.
const CLI_CHANNEL: &str = "cli";

/// Runs the `parley serve` command.
pub async fn run_serve(config: ParleyConfig) -> Result<(), DialogError> {
    init_tracing(&config.dialog.log_level);
    parley_pipeline::recording::register_metrics();
    parley_janitor::recording::register_metrics();

    let store = parley_storage::open_session_store(&config.storage).await?;
    info!(backend = ?config.storage.backend, "session store ready");

    let engine = Arc::new(build_engine(&config, Arc::clone(&store))?);

    let janitor = if config.janitor.enabled {
        let janitor = DialogJanitor::new(
            config.janitor.clone(),
            Arc::clone(&store),
            engine.clone(),
            Arc::new(SystemClock),
            Arc::new(TokioScheduler),
        );
        janitor.install();
        Some(janitor)
    } else {
        info!("dialog janitor disabled");
        None
    };

    let cancel = shutdown::install_signal_handler();
    info!(name = %config.dialog.name, "parley running, reading events from stdin");

    read_stdin(&engine, &config, &target_name(), &cancel).await;
    cancel.cancelled().await;

    if let Some(janitor) = janitor {
        janitor.uninstall();
    }
    info!("parley stopped");
    Ok(())
}

/// An engine with the built-in incoming middleware registered.
fn build_engine(
    config: &ParleyConfig,
    store: Arc<dyn SessionStore>,
) -> Result<EventEngine, DialogError> {
    let engine = EventEngine::new(config.pipeline.stage_timeout());
    engine.register(SessionExpiry::definition(Arc::clone(&store)))?;
    engine.register(SessionActivity::definition(store, Arc::new(SystemClock)))?;
    Ok(engine)
}

/// Sends each stdin line through the incoming pipeline until EOF or shutdown.
async fn read_stdin(
    engine: &EventEngine,
    config: &ParleyConfig,
    target: &str,
    cancel: &CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let event = text_event(config, target, text);
                    match engine.send_event(event).await {
                        Ok(report) => debug!(
                            outcome = ?report.outcome,
                            stages = report.stages.len(),
                            "stdin event processed"
                        ),
                        Err(e) => warn!(error = %e, "stdin event rejected"),
                    }
                }
                Ok(None) => {
                    info!("stdin closed, waiting for shutdown signal");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    return;
                }
            },
            _ = cancel.cancelled() => return,
        }
    }
}

fn text_event(config: &ParleyConfig, target: &str, text: &str) -> Event {
    Event::builder("text", CLI_CHANNEL, target, Direction::Incoming)
        .payload(json!({ "type": "text", "text": text }))
        .debug(config.pipeline.debug_events)
        .build()
}

/// The local user name, used as the stdin event target.
fn target_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "local".to_string())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
