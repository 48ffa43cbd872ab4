// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink that captures events for assertion in tests.

use std::collections::HashSet;

use async_trait::async_trait;
use parley_core::{DialogError, Direction, Event, EventSink};
use tokio::sync::Mutex;

/// The routing fields and payload of a submitted event.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedEvent {
    pub event_type: String,
    pub channel: String,
    pub target: String,
    pub direction: Direction,
    pub payload: serde_json::Value,
}

/// An [`EventSink`] that records every event it accepts.
///
/// Events addressed to a target registered with
/// [`fail_target`](RecordingSink::fail_target) are rejected and not recorded.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CapturedEvent>>,
    failing_targets: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later submission for `target` fail.
    pub async fn fail_target(&self, target: impl Into<String>) {
        self.failing_targets.lock().await.insert(target.into());
    }

    pub async fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().await.clone()
    }

    pub async fn event_count(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send_event(&self, event: Event) -> Result<(), DialogError> {
        if self.failing_targets.lock().await.contains(&event.target) {
            return Err(DialogError::Internal(format!(
                "delivery to {} rejected",
                event.target
            )));
        }
        self.events.lock().await.push(CapturedEvent {
            event_type: event.event_type,
            channel: event.channel,
            target: event.target,
            direction: event.direction,
            payload: event.payload,
        });
        Ok(())
    }
}
