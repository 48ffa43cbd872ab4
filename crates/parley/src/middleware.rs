// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in incoming middleware that keeps the session store in step with
//! the conversation.
//!
//! `session-expiry` runs first and consumes the janitor's timeout events.
//! `session-activity` then records the last activity of every other event.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::{Clock, DialogSession, Direction, Event, SessionId, SessionStore};
use parley_janitor::TIMEOUT_EVENT_TYPE;
use parley_pipeline::{MiddlewareDefinition, MiddlewareHandler, Next};
use tracing::{debug, info};

pub const SESSION_EXPIRY: &str = "session-expiry";
pub const SESSION_ACTIVITY: &str = "session-activity";

/// Touches the session's `active_on` for every incoming event.
pub struct SessionActivity {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl SessionActivity {
    pub fn definition(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> MiddlewareDefinition {
        MiddlewareDefinition::new(SESSION_ACTIVITY, Direction::Incoming, Self { store, clock })
            .with_order(-50)
            .with_description("Records the last user activity of a session")
    }
}

#[async_trait]
impl MiddlewareHandler for SessionActivity {
    async fn handle(&self, event: Arc<Event>, next: Next) {
        let id = SessionId::new(&event.channel, &event.target);
        let now = self.clock.now();

        let session = match self.store.get_session(id.as_str()).await {
            Ok(Some(mut session)) => {
                session.active_on = now;
                session
            }
            Ok(None) => {
                debug!(session_id = %id, "starting new session");
                DialogSession::new(id.as_str(), now)
            }
            Err(e) => return next.fail(e),
        };

        match self.store.upsert_session(&session).await {
            Ok(()) => next.proceed(),
            Err(e) => next.fail(e),
        }
    }
}

/// Clears sessions named by `dialog_timeout` events, along with their
/// substates, and swallows the event.
pub struct SessionExpiry {
    store: Arc<dyn SessionStore>,
}

impl SessionExpiry {
    pub fn definition(store: Arc<dyn SessionStore>) -> MiddlewareDefinition {
        MiddlewareDefinition::new(SESSION_EXPIRY, Direction::Incoming, Self { store })
            .with_order(-100)
            .with_description("Ends sessions the janitor timed out")
    }
}

#[async_trait]
impl MiddlewareHandler for SessionExpiry {
    async fn handle(&self, event: Arc<Event>, next: Next) {
        if event.event_type != TIMEOUT_EVENT_TYPE {
            return next.skip();
        }

        let session_id = event
            .payload
            .get("sessionId")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| SessionId::new(&event.channel, &event.target).to_string());

        if let Err(e) = self.store.delete_session(&session_id).await {
            return next.fail(e);
        }
        match self.store.delete_substates(&session_id).await {
            Ok(substates) => {
                info!(session_id = %session_id, substates, "session timed out");
                next.swallow();
            }
            Err(e) => next.fail(e),
        }
    }
}
