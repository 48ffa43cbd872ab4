// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session persistence for the Parley dialog core.
//!
//! [`SqliteSessionStore`] keeps sessions in a WAL-mode SQLite file, with all
//! access serialized through `tokio-rusqlite`'s background thread.
//! [`MemorySessionStore`] is a process-local store for tests and
//! single-process deployments.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use parley_config::{StorageBackend, StorageConfig};
use parley_core::{DialogError, SessionStore};

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Opens the store selected by `config.backend`.
pub async fn open_session_store(
    config: &StorageConfig,
) -> Result<Arc<dyn SessionStore>, DialogError> {
    match config.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteSessionStore::open(config).await?)),
        StorageBackend::Memory => Ok(Arc::new(MemorySessionStore::new())),
    }
}
