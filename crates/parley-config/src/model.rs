// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley dialog core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! rejected at startup instead of silently ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub dialog: DialogConfig,

    /// Middleware pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Session janitor settings.
    #[serde(default)]
    pub janitor: JanitorConfig,

    /// Session store settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialogConfig {
    #[serde(default = "default_dialog_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            name: default_dialog_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_dialog_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Middleware pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// How long a stage may take to signal completion before it is marked timed out.
    #[serde(default = "default_stage_timeout_ms")]
    pub timeout_ms: u64,

    /// Attach a processing trace to events created by the binary.
    #[serde(default)]
    pub debug_events: bool,
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_stage_timeout_ms(),
            debug_events: false,
        }
    }
}

fn default_stage_timeout_ms() -> u64 {
    2000
}

/// Session janitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JanitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base sweep interval. A random jitter is added at install time.
    #[serde(default = "default_janitor_interval_ms")]
    pub interval_ms: u64,

    /// Upper bound (exclusive) of the random jitter added to the interval.
    #[serde(default = "default_janitor_jitter_ms")]
    pub jitter_ms: u64,

    /// Inactivity after which a session is timed out.
    #[serde(default = "default_session_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of sessions handled by one sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Channel used for session ids without a channel prefix.
    #[serde(default = "default_fallback_channel")]
    pub fallback_channel: String,

    /// Reload each session right before emitting its timeout event.
    #[serde(default = "default_true")]
    pub recheck_before_timeout: bool,
}

impl JanitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_janitor_interval_ms(),
            jitter_ms: default_janitor_jitter_ms(),
            timeout_ms: default_session_timeout_ms(),
            batch_size: default_batch_size(),
            fallback_channel: default_fallback_channel(),
            recheck_before_timeout: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_janitor_interval_ms() -> u64 {
    10_000
}

fn default_janitor_jitter_ms() -> u64 {
    5_000
}

fn default_session_timeout_ms() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    250
}

fn default_fallback_channel() -> String {
    "web".to_string()
}

/// Which session store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join("parley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parley.db"))
        .to_string_lossy()
        .into_owned()
}
