// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Middleware handler that replies from a script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parley_core::Event;
use parley_pipeline::{MiddlewareHandler, Next};

/// How a scripted stage completes.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Proceed,
    Swallow,
    Skip,
    Fail(String),
    /// Drops the completion handle without signalling.
    Forget,
    /// Waits, then replies.
    After(Duration, Box<Reply>),
}

struct Script {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    seen: Mutex<Vec<String>>,
}

/// A [`MiddlewareHandler`] that answers each invocation with the next
/// scripted [`Reply`], then with the fallback once the script runs out.
///
/// Clones share the script and the record of seen event types.
#[derive(Clone)]
pub struct ScriptedMiddleware {
    script: Arc<Script>,
}

impl ScriptedMiddleware {
    pub fn new(replies: impl IntoIterator<Item = Reply>, fallback: Reply) -> Self {
        Self {
            script: Arc::new(Script {
                replies: Mutex::new(replies.into_iter().collect()),
                fallback,
                seen: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Always replies with `reply`.
    pub fn always(reply: Reply) -> Self {
        Self::new([], reply)
    }

    /// Event types this middleware was invoked with, in order.
    pub fn seen(&self) -> Vec<String> {
        self.script
            .seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.seen().len()
    }

    fn next_reply(&self, event: &Event) -> Reply {
        self.script
            .seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(event.event_type.clone());
        self.script
            .replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.script.fallback.clone())
    }
}

async fn answer(mut reply: Reply, next: Next) {
    loop {
        match reply {
            Reply::After(delay, then) => {
                tokio::time::sleep(delay).await;
                reply = *then;
            }
            Reply::Proceed => return next.proceed(),
            Reply::Swallow => return next.swallow(),
            Reply::Skip => return next.skip(),
            Reply::Fail(message) => return next.fail(message),
            Reply::Forget => {
                drop(next);
                return;
            }
        }
    }
}

#[async_trait]
impl MiddlewareHandler for ScriptedMiddleware {
    async fn handle(&self, event: Arc<Event>, next: Next) {
        let reply = self.next_reply(&event);
        answer(reply, next).await;
    }
}
