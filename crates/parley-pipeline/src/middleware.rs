// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Middleware registration records and the handler invocation contract.
//!
//! A handler receives the event and a [`Next`] completion handle. Consuming
//! the handle is the handler's single "done" signal; `Next` is not `Clone`,
//! so a second signal cannot be expressed. Dropping it without signalling is
//! treated as a handler failure.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::{Direction, Event};
use tokio::sync::oneshot;

/// What a stage reported through its completion handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StageSignal {
    Completed,
    Swallowed,
    Skipped,
    Failed(String),
}

/// Completion handle passed to every middleware invocation.
#[must_use = "a middleware must signal completion exactly once"]
pub struct Next {
    tx: oneshot::Sender<StageSignal>,
}

impl Next {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<StageSignal>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Signals completion with the raw `(error, swallow, skip)` triple.
    ///
    /// An error takes precedence, then `swallow`, then `skip`.
    pub fn done<E: fmt::Display>(self, error: Option<E>, swallow: bool, skip: bool) {
        let signal = match (error, swallow, skip) {
            (Some(e), _, _) => StageSignal::Failed(e.to_string()),
            (None, true, _) => StageSignal::Swallowed,
            (None, false, true) => StageSignal::Skipped,
            (None, false, false) => StageSignal::Completed,
        };
        self.send(signal);
    }

    /// The stage finished normally; continue with the next one.
    pub fn proceed(self) {
        self.send(StageSignal::Completed);
    }

    /// The event is fully handled; no later stage runs.
    pub fn swallow(self) {
        self.send(StageSignal::Swallowed);
    }

    /// The stage declined to act; continue with the next one.
    pub fn skip(self) {
        self.send(StageSignal::Skipped);
    }

    /// The stage failed. The pipeline logs it and continues.
    pub fn fail(self, error: impl fmt::Display) {
        self.send(StageSignal::Failed(error.to_string()));
    }

    fn send(self, signal: StageSignal) {
        // The engine may have stopped waiting after a timeout.
        let _ = self.tx.send(signal);
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// The invocation contract every middleware implements.
///
/// The handler runs on its own task. The engine stops waiting for it once the
/// stage timeout elapses but never cancels it, so work started by a slow
/// handler may still land after later stages ran.
#[async_trait]
pub trait MiddlewareHandler: Send + Sync {
    async fn handle(&self, event: Arc<Event>, next: Next);
}

#[async_trait]
impl<F, Fut> MiddlewareHandler for F
where
    F: Fn(Arc<Event>, Next) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, event: Arc<Event>, next: Next) {
        self(event, next).await
    }
}

/// A middleware registration record.
#[derive(Clone)]
pub struct MiddlewareDefinition {
    /// Unique per direction.
    pub name: String,
    pub description: String,
    pub direction: Direction,
    /// Ascending; equal orders keep registration order.
    pub order: i32,
    pub handler: Arc<dyn MiddlewareHandler>,
    /// Disabled middleware is never invoked.
    pub enabled: bool,
    /// Overrides the pipeline-wide stage timeout.
    pub timeout: Option<Duration>,
}

impl MiddlewareDefinition {
    /// An enabled definition with order 0 and the pipeline's default timeout.
    pub fn new(
        name: impl Into<String>,
        direction: Direction,
        handler: impl MiddlewareHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            direction,
            order: 0,
            handler: Arc::new(handler),
            enabled: true,
            timeout: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl fmt::Debug for MiddlewareDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareDefinition")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("order", &self.order)
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
