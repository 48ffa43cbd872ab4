// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed [`SessionStore`].
//!
//! All reads and writes go through the single tokio-rusqlite background
//! thread. Timestamps are stored as RFC 3339 text with millisecond precision
//! and a `Z` suffix, so lexical order equals chronological order.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parley_config::StorageConfig;
use parley_core::{DialogError, DialogSession, SUBSTATE_DELIMITER, SessionStore};
use rusqlite::{OptionalExtension, Row, params};
use tokio_rusqlite::Connection;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dialog_sessions (
    id              TEXT PRIMARY KEY NOT NULL,
    active_on       TEXT NOT NULL,
    context_expiry  TEXT,
    session_expiry  TEXT,
    context         TEXT NOT NULL DEFAULT 'null'
);
CREATE INDEX IF NOT EXISTS idx_dialog_sessions_active_on
    ON dialog_sessions (active_on);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "SELECT id, active_on, context_expiry, session_expiry, context \
                              FROM dialog_sessions";

/// Convert a tokio-rusqlite error into DialogError::Storage.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> DialogError {
    DialogError::Storage {
        source: Box::new(e),
    }
}

/// Session store persisted in a SQLite database.
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Opens (creating if needed) the database at `config.database_path`.
    pub async fn open(config: &StorageConfig) -> Result<Self, DialogError> {
        Self::open_path(&config.database_path, config.wal_mode).await
    }

    /// Opens the database at `path`, creating parent directories and schema.
    pub async fn open_path(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, DialogError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DialogError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| DialogError::Storage {
                source: Box::new(e),
            })?;
        let store = Self { conn };
        store.init(wal_mode).await?;
        debug!(path = %path.display(), wal_mode, "SQLite session store opened");
        Ok(store)
    }

    /// A private in-memory database.
    pub async fn open_in_memory() -> Result<Self, DialogError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DialogError::Storage {
                source: Box::new(e),
            })?;
        let store = Self { conn };
        store.init(false).await?;
        Ok(store)
    }

    async fn init(&self, wal_mode: bool) -> Result<(), DialogError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    let mode: String = conn
                        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                    debug!(journal_mode = %mode, "journal mode set");
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoints the WAL so the database file is self-contained.
    pub async fn close(&self) -> Result<(), DialogError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Number of stored sessions, substates included.
    pub async fn count(&self) -> Result<usize, DialogError> {
        self.conn
            .call(|conn| -> Result<usize, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM dialog_sessions", [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| usize::try_from(n).unwrap_or(0))
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn find_stale_sessions(
        &self,
        older_than: DateTime<Utc>,
        exclude_pattern: &str,
        limit: usize,
    ) -> Result<Vec<DialogSession>, DialogError> {
        let cutoff = encode_time(older_than);
        let pattern = exclude_pattern.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.conn
            .call(move |conn| -> Result<Vec<DialogSession>, rusqlite::Error> {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS}
                     WHERE active_on < ?1 AND (?2 = '' OR instr(id, ?2) = 0)
                     ORDER BY active_on ASC, id ASC
                     LIMIT ?3"
                ))?;
                let rows = stmt.query_map(params![cutoff, pattern, limit], session_from_row)?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_session(&self, id: &str) -> Result<Option<DialogSession>, DialogError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<DialogSession>, rusqlite::Error> {
                conn.query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    params![id],
                    session_from_row,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn upsert_session(&self, session: &DialogSession) -> Result<(), DialogError> {
        let id = session.id.clone();
        let active_on = encode_time(session.active_on);
        let context_expiry = session.context_expiry.map(encode_time);
        let session_expiry = session.session_expiry.map(encode_time);
        let context = serde_json::to_string(&session.context).map_err(|e| DialogError::Storage {
            source: Box::new(e),
        })?;

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO dialog_sessions (id, active_on, context_expiry, session_expiry, context)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                         active_on = excluded.active_on,
                         context_expiry = excluded.context_expiry,
                         session_expiry = excluded.session_expiry,
                         context = excluded.context",
                    params![id, active_on, context_expiry, session_expiry, context],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete_session(&self, id: &str) -> Result<(), DialogError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM dialog_sessions WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete_substates(&self, root_id: &str) -> Result<usize, DialogError> {
        let prefix = format!("{root_id}{SUBSTATE_DELIMITER}");
        self.conn
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM dialog_sessions WHERE substr(id, 1, length(?1)) = ?1",
                    params![prefix],
                )
            })
            .await
            .map_err(map_tr_err)
    }
}

fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_time(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn decode_optional_time(
    idx: usize,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    raw.map(|r| decode_time(idx, &r)).transpose()
}

fn session_from_row(row: &Row<'_>) -> Result<DialogSession, rusqlite::Error> {
    let active_on: String = row.get(1)?;
    let context: String = row.get(4)?;
    Ok(DialogSession {
        id: row.get(0)?,
        active_on: decode_time(1, &active_on)?,
        context_expiry: decode_optional_time(2, row.get(2)?)?,
        session_expiry: decode_optional_time(3, row.get(3)?)?,
        context: serde_json::from_str(&context).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}
