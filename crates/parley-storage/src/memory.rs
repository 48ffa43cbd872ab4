// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local [`SessionStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parley_core::{DialogError, DialogSession, SUBSTATE_DELIMITER, SessionStore};

/// Sessions held in a concurrent map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, DialogSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_stale_sessions(
        &self,
        older_than: DateTime<Utc>,
        exclude_pattern: &str,
        limit: usize,
    ) -> Result<Vec<DialogSession>, DialogError> {
        let mut stale: Vec<DialogSession> = self
            .sessions
            .iter()
            .filter(|entry| entry.is_stale(older_than))
            .filter(|entry| exclude_pattern.is_empty() || !entry.id.contains(exclude_pattern))
            .map(|entry| entry.value().clone())
            .collect();
        stale.sort_by(|a, b| a.active_on.cmp(&b.active_on).then_with(|| a.id.cmp(&b.id)));
        stale.truncate(limit);
        Ok(stale)
    }

    async fn get_session(&self, id: &str) -> Result<Option<DialogSession>, DialogError> {
        Ok(self.sessions.get(id).map(|entry| entry.value().clone()))
    }

    async fn upsert_session(&self, session: &DialogSession) -> Result<(), DialogError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), DialogError> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn delete_substates(&self, root_id: &str) -> Result<usize, DialogError> {
        let prefix = format!("{root_id}{SUBSTATE_DELIMITER}");
        let before = self.sessions.len();
        self.sessions.retain(|id, _| !id.starts_with(&prefix));
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
