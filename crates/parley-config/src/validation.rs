// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::{ParleyConfig, StorageBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates a deserialized configuration, collecting every failure.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.dialog.name.trim().is_empty() {
        errors.push(ConfigError::invalid("dialog.name", "must not be empty"));
    }
    if !LOG_LEVELS.contains(&config.dialog.log_level.as_str()) {
        errors.push(ConfigError::invalid(
            "dialog.log_level",
            format!(
                "`{}` is not one of {}",
                config.dialog.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if config.pipeline.timeout_ms == 0 {
        errors.push(ConfigError::invalid(
            "pipeline.timeout_ms",
            "must be greater than zero",
        ));
    }

    let janitor = &config.janitor;
    if janitor.interval_ms == 0 {
        errors.push(ConfigError::invalid(
            "janitor.interval_ms",
            "must be greater than zero",
        ));
    }
    if janitor.timeout_ms == 0 {
        errors.push(ConfigError::invalid(
            "janitor.timeout_ms",
            "must be greater than zero",
        ));
    }
    if janitor.batch_size == 0 {
        errors.push(ConfigError::invalid(
            "janitor.batch_size",
            "must be at least 1",
        ));
    }
    if janitor.fallback_channel.trim().is_empty() {
        errors.push(ConfigError::invalid(
            "janitor.fallback_channel",
            "must not be empty",
        ));
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::invalid(
            "storage.database_path",
            "must not be empty when backend is sqlite",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
