// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event engine: one middleware chain per direction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::{
    DialogError, Direction, Event, EventDestination, EventSink, StepScope, StepStatus,
};
use tracing::{debug, info};

use crate::chain::{MiddlewareChain, RunReport};
use crate::middleware::MiddlewareDefinition;
use crate::recording;

/// Default time a stage may take before the engine stops waiting.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_millis(2000);

const DEFAULT_REPLY_TYPE: &str = "text";

/// Routes events through the incoming or outgoing middleware chain.
///
/// Holds no per-run state, so concurrent `send_event` calls are independent.
pub struct EventEngine {
    incoming: MiddlewareChain,
    outgoing: MiddlewareChain,
}

impl EventEngine {
    pub fn new(stage_timeout: Duration) -> Self {
        Self {
            incoming: MiddlewareChain::new(Direction::Incoming, stage_timeout),
            outgoing: MiddlewareChain::new(Direction::Outgoing, stage_timeout),
        }
    }

    pub fn chain(&self, direction: Direction) -> &MiddlewareChain {
        match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        }
    }

    /// Registers a middleware on the chain matching its direction.
    pub fn register(&self, definition: MiddlewareDefinition) -> Result<(), DialogError> {
        info!(
            middleware = %definition.name,
            direction = %definition.direction,
            order = definition.order,
            "registering middleware"
        );
        self.chain(definition.direction).register(definition)
    }

    pub fn remove_middleware(&self, direction: Direction, name: &str) -> bool {
        self.chain(direction).remove(name)
    }

    /// Validates an event and runs it through its direction's chain.
    pub async fn send_event(&self, event: Event) -> Result<RunReport, DialogError> {
        event.validate()?;
        let event = Arc::new(event);
        let direction = event.direction;
        let scope_name = direction.to_string();

        recording::record_event(direction);
        event.add_step(StepScope::Received, &scope_name, StepStatus::Received);
        debug!(
            event_id = event.id,
            event_type = %event.event_type,
            channel = %event.channel,
            direction = %direction,
            "processing event"
        );

        let report = self.chain(direction).run(Arc::clone(&event)).await;

        event.add_step(StepScope::EndProcessing, &scope_name, StepStatus::Completed);
        debug!(
            event_id = event.id,
            stages = report.stages.len(),
            swallowed = report.is_swallowed(),
            "event processed"
        );
        Ok(report)
    }

    /// Sends one outgoing event per payload to `destination`.
    ///
    /// The event type is taken from each payload's `type` field, `text` by
    /// default.
    pub async fn reply_to_event(
        &self,
        destination: &EventDestination,
        payloads: Vec<serde_json::Value>,
        incoming_event_id: Option<u64>,
    ) -> Result<Vec<RunReport>, DialogError> {
        let mut reports = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let event_type = payload
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or(DEFAULT_REPLY_TYPE)
                .to_string();
            let mut builder = Event::builder(
                event_type,
                destination.channel.clone(),
                destination.target.clone(),
                Direction::Outgoing,
            )
            .payload(payload);
            if let Some(id) = incoming_event_id {
                builder = builder.incoming_event_id(id);
            }
            reports.push(self.send_event(builder.build()).await?);
        }
        Ok(reports)
    }
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new(DEFAULT_STAGE_TIMEOUT)
    }
}

#[async_trait]
impl EventSink for EventEngine {
    async fn send_event(&self, event: Event) -> Result<(), DialogError> {
        EventEngine::send_event(self, event).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Next;
    use serde_json::json;
    use std::sync::Mutex;

    fn collecting(
        name: &str,
        direction: Direction,
        seen: &Arc<Mutex<Vec<(String, Option<u64>)>>>,
    ) -> MiddlewareDefinition {
        let seen = Arc::clone(seen);
        MiddlewareDefinition::new(name, direction, move |event: Arc<Event>, next: Next| {
            seen.lock()
                .unwrap()
                .push((event.event_type.clone(), event.incoming_event_id));
            async move { next.proceed() }
        })
    }

    #[tokio::test]
    async fn events_are_routed_by_direction() {
        let engine = EventEngine::default();
        let incoming = Arc::new(Mutex::new(Vec::new()));
        let outgoing = Arc::new(Mutex::new(Vec::new()));
        engine
            .register(collecting("in", Direction::Incoming, &incoming))
            .unwrap();
        engine
            .register(collecting("out", Direction::Outgoing, &outgoing))
            .unwrap();

        let event = Event::builder("text", "web", "u1", Direction::Incoming).build();
        engine.send_event(event).await.unwrap();

        assert_eq!(incoming.lock().unwrap().len(), 1);
        assert!(outgoing.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_events_never_reach_middleware() {
        let engine = EventEngine::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        engine
            .register(collecting("in", Direction::Incoming, &seen))
            .unwrap();

        let event = Event::builder("", "web", "u1", Direction::Incoming).build();
        let err = engine.send_event(event).await.unwrap_err();
        assert!(matches!(err, DialogError::InvalidEvent(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn replies_become_outgoing_events() {
        let engine = EventEngine::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        engine
            .register(collecting("out", Direction::Outgoing, &seen))
            .unwrap();

        let destination = EventDestination {
            channel: "web".into(),
            target: "u1".into(),
        };
        let reports = engine
            .reply_to_event(
                &destination,
                vec![json!({"text": "hi"}), json!({"type": "image", "url": "x.png"})],
                Some(42),
            )
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("text".to_string(), Some(42)), ("image".to_string(), Some(42))]
        );
    }

    #[tokio::test]
    async fn removed_middleware_stops_running() {
        let engine = EventEngine::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        engine
            .register(collecting("in", Direction::Incoming, &seen))
            .unwrap();
        assert!(engine.remove_middleware(Direction::Incoming, "in"));

        let event = Event::builder("text", "web", "u1", Direction::Incoming).build();
        let report = engine.send_event(event).await.unwrap();
        assert!(report.stages.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }
}
