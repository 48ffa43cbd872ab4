// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DialogError;
use crate::session::DialogSession;

/// A generic row store holding dialog sessions.
///
/// Rows are shared between live conversational turns and the janitor; no
/// implementation is required to provide compare-and-swap semantics.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Sessions whose last activity is strictly older than `older_than`.
    ///
    /// Rows whose id contains `exclude_pattern` are omitted. At most `limit`
    /// rows are returned, oldest activity first.
    async fn find_stale_sessions(
        &self,
        older_than: DateTime<Utc>,
        exclude_pattern: &str,
        limit: usize,
    ) -> Result<Vec<DialogSession>, DialogError>;

    /// Loads a session by raw id.
    async fn get_session(&self, id: &str) -> Result<Option<DialogSession>, DialogError>;

    /// Inserts or replaces a session.
    async fn upsert_session(&self, session: &DialogSession) -> Result<(), DialogError>;

    /// Removes a session. Removing a missing id is not an error.
    async fn delete_session(&self, id: &str) -> Result<(), DialogError>;

    /// Removes every substate nested under `root_id`, leaving the root row.
    ///
    /// Returns the number of rows removed.
    async fn delete_substates(&self, root_id: &str) -> Result<usize, DialogError>;
}
