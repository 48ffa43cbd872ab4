// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composite session identifiers and the persisted dialog session record.
//!
//! A root session id encodes `channel:target`; the target may itself contain
//! `:`. A substate session (a nested dialog invocation) appends
//! [`SUBSTATE_DELIMITER`] and a substate name to its root id.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separates a root session id from the name of a nested dialog invocation.
pub const SUBSTATE_DELIMITER: &str = "||";

/// Channel assumed for ids that carry no channel prefix.
pub const FALLBACK_CHANNEL: &str = "web";

const CHANNEL_DELIMITER: char = ':';

/// A decoded session id.
///
/// [`SessionId::parse`] is total: every string decodes to some id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    raw: String,
    channel: Option<String>,
    target: String,
    substate: Option<String>,
}

impl SessionId {
    /// Encodes a root session id for a user on a channel.
    pub fn new(channel: &str, target: &str) -> Self {
        Self {
            raw: format!("{channel}{CHANNEL_DELIMITER}{target}"),
            channel: Some(channel.to_string()),
            target: target.to_string(),
            substate: None,
        }
    }

    /// Decodes a raw id.
    pub fn parse(raw: &str) -> Self {
        let (root, substate) = match raw.split_once(SUBSTATE_DELIMITER) {
            Some((root, sub)) => (root, Some(sub.to_string())),
            None => (raw, None),
        };

        let mut parts = root.split(CHANNEL_DELIMITER);
        let first = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        let (channel, target) = if rest.is_empty() {
            (None, first.to_string())
        } else {
            (
                Some(first.to_string()),
                rest.join(&CHANNEL_DELIMITER.to_string()),
            )
        };

        Self {
            raw: raw.to_string(),
            channel,
            target,
            substate,
        }
    }

    /// Id of a nested dialog invocation under this session's root.
    pub fn substate(&self, name: &str) -> Self {
        Self::parse(&format!("{}{SUBSTATE_DELIMITER}{name}", self.root()))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The id without any substate suffix.
    pub fn root(&self) -> &str {
        match self.raw.split_once(SUBSTATE_DELIMITER) {
            Some((root, _)) => root,
            None => &self.raw,
        }
    }

    pub fn is_substate(&self) -> bool {
        self.substate.is_some()
    }

    pub fn substate_name(&self) -> Option<&str> {
        self.substate.as_deref()
    }

    /// The encoded channel, if the id carries one.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// The encoded channel, or `fallback` for ids without a channel prefix.
    pub fn channel_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.channel.as_deref().unwrap_or(fallback)
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Persisted state of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogSession {
    pub id: String,
    /// Last user activity.
    pub active_on: DateTime<Utc>,
    pub context_expiry: Option<DateTime<Utc>>,
    pub session_expiry: Option<DateTime<Utc>>,
    /// Interpreter-owned dialog context (current flow and node, queued instructions).
    #[serde(default)]
    pub context: serde_json::Value,
}

impl DialogSession {
    pub fn new(id: impl Into<String>, active_on: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            active_on,
            context_expiry: None,
            session_expiry: None,
            context: serde_json::Value::Null,
        }
    }

    pub fn session_id(&self) -> SessionId {
        SessionId::parse(&self.id)
    }

    /// True when the last activity happened strictly before `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.active_on < cutoff
    }
}
