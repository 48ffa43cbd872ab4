// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversational event and its processing trace.
//!
//! An [`Event`] is created once per conversational turn (or synthetically by
//! the janitor) and shared behind an `Arc` with every middleware stage. All
//! fields are fixed at construction; the only mutable part is the optional
//! processing trace, which exists only when debugging is enabled.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DialogError;

/// Tie-break space appended to the millisecond timestamp of an event id.
const EVENT_ID_SPREAD: u64 = 100_000;

/// Direction an event travels through the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Scope component of a processing trace key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StepScope {
    #[strum(serialize = "received")]
    Received,
    #[strum(serialize = "mw")]
    Middleware,
    #[strum(serialize = "dialog")]
    Dialog,
    #[strum(serialize = "end")]
    EndProcessing,
}

/// Status component of a processing trace key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum StepStatus {
    Received,
    Started,
    Completed,
    Swallowed,
    Skipped,
    TimedOut,
    Error,
}

/// Where a reply should be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDestination {
    pub channel: String,
    pub target: String,
}

/// A single conversational event.
#[derive(Debug)]
pub struct Event {
    /// Time-ordered identifier with a random tie-break.
    pub id: u64,
    /// Type tag, e.g. `text` or `dialog_timeout`.
    pub event_type: String,
    pub channel: String,
    pub direction: Direction,
    /// Addressable end-user identifier.
    pub target: String,
    /// Channel-specific payload, opaque to the core.
    pub payload: serde_json::Value,
    /// Human-readable summary computed once at construction.
    pub preview: Option<String>,
    pub created_on: DateTime<Utc>,
    /// Id of the incoming event this one answers, for outgoing replies.
    pub incoming_event_id: Option<u64>,
    processing: Option<Mutex<BTreeMap<String, DateTime<Utc>>>>,
}

impl Event {
    /// Starts building an event with the mandatory routing fields.
    pub fn builder(
        event_type: impl Into<String>,
        channel: impl Into<String>,
        target: impl Into<String>,
        direction: Direction,
    ) -> EventBuilder {
        EventBuilder {
            event_type: event_type.into(),
            channel: channel.into(),
            target: target.into(),
            direction,
            payload: serde_json::Value::Object(serde_json::Map::new()),
            preview: None,
            debug: false,
            incoming_event_id: None,
            created_on: None,
        }
    }

    /// Whether processing steps are being traced for this event.
    pub fn is_debug(&self) -> bool {
        self.processing.is_some()
    }

    /// The delivery destination of this event.
    pub fn destination(&self) -> EventDestination {
        EventDestination {
            channel: self.channel.clone(),
            target: self.target.clone(),
        }
    }

    /// Appends `<scope>:<name>:<status>` to the processing trace.
    ///
    /// Does nothing at all when debugging is off.
    pub fn add_step(&self, scope: StepScope, name: &str, status: StepStatus) {
        let Some(processing) = &self.processing else {
            return;
        };
        let key = format!("{scope}:{name}:{status}");
        let mut map = processing.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(key, Utc::now());
    }

    /// A copy of the processing trace, or `None` when debugging is off.
    pub fn processing(&self) -> Option<BTreeMap<String, DateTime<Utc>>> {
        self.processing
            .as_ref()
            .map(|p| p.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    /// Checks the routing fields and payload shape.
    pub fn validate(&self) -> Result<(), DialogError> {
        if self.event_type.trim().is_empty() {
            return Err(DialogError::InvalidEvent("type must not be empty".into()));
        }
        if self.channel.trim().is_empty() {
            return Err(DialogError::InvalidEvent("channel must not be empty".into()));
        }
        if self.target.trim().is_empty() {
            return Err(DialogError::InvalidEvent("target must not be empty".into()));
        }
        if !self.payload.is_object() {
            return Err(DialogError::InvalidEvent(format!(
                "payload of event {} must be an object",
                self.id
            )));
        }
        Ok(())
    }
}

/// Builder for [`Event`].
#[derive(Debug)]
pub struct EventBuilder {
    event_type: String,
    channel: String,
    target: String,
    direction: Direction,
    payload: serde_json::Value,
    preview: Option<String>,
    debug: bool,
    incoming_event_id: Option<u64>,
    created_on: Option<DateTime<Utc>>,
}

impl EventBuilder {
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Overrides the preview otherwise derived from the payload.
    pub fn preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    /// Enables the processing trace.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn incoming_event_id(mut self, id: u64) -> Self {
        self.incoming_event_id = Some(id);
        self
    }

    pub fn created_on(mut self, created_on: DateTime<Utc>) -> Self {
        self.created_on = Some(created_on);
        self
    }

    pub fn build(self) -> Event {
        let created_on = self.created_on.unwrap_or_else(Utc::now);
        let preview = self.preview.or_else(|| derive_preview(&self.payload));
        Event {
            id: generate_event_id(created_on, &mut rand::thread_rng()),
            event_type: self.event_type,
            channel: self.channel,
            direction: self.direction,
            target: self.target,
            payload: self.payload,
            preview,
            created_on,
            incoming_event_id: self.incoming_event_id,
            processing: self.debug.then(|| Mutex::new(BTreeMap::new())),
        }
    }
}

/// `payload.preview` wins over `payload.text`; non-string values are ignored.
fn derive_preview(payload: &serde_json::Value) -> Option<String> {
    ["preview", "text"]
        .iter()
        .find_map(|key| payload.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Millisecond timestamp scaled by [`EVENT_ID_SPREAD`] plus a random tie-break.
pub fn generate_event_id<R: Rng>(at: DateTime<Utc>, rng: &mut R) -> u64 {
    let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
    millis
        .saturating_mul(EVENT_ID_SPREAD)
        .saturating_add(rng.gen_range(0..EVENT_ID_SPREAD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn text_event(payload: serde_json::Value) -> EventBuilder {
        Event::builder("text", "web", "user-1", Direction::Incoming).payload(payload)
    }

    #[test]
    fn preview_prefers_payload_preview_over_text() {
        let event = text_event(json!({"text": "hello", "preview": "hi!"})).build();
        assert_eq!(event.preview.as_deref(), Some("hi!"));

        let event = text_event(json!({"text": "hello"})).build();
        assert_eq!(event.preview.as_deref(), Some("hello"));

        let event = text_event(json!({"image": "x.png"})).build();
        assert!(event.preview.is_none());
    }

    #[test]
    fn explicit_preview_overrides_payload() {
        let event = text_event(json!({"text": "hello"}))
            .preview("custom")
            .build();
        assert_eq!(event.preview.as_deref(), Some("custom"));
    }

    #[test]
    fn trace_is_absent_without_debug() {
        let event = text_event(json!({})).build();
        event.add_step(StepScope::Middleware, "auth", StepStatus::Completed);
        assert!(!event.is_debug());
        assert!(event.processing().is_none());
    }

    #[test]
    fn trace_records_scope_name_status() {
        let event = text_event(json!({})).debug(true).build();
        event.add_step(StepScope::Middleware, "auth", StepStatus::TimedOut);
        event.add_step(StepScope::Received, "incoming", StepStatus::Received);

        let trace = event.processing().unwrap();
        assert!(trace.contains_key("mw:auth:timedOut"));
        assert!(trace.contains_key("received:incoming:received"));
    }

    #[test]
    fn event_ids_are_time_ordered() {
        let mut rng = StdRng::seed_from_u64(7);
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::milliseconds(1);
        for _ in 0..100 {
            let a = generate_event_id(earlier, &mut rng);
            let b = generate_event_id(later, &mut rng);
            assert!(a < b);
        }
    }

    #[test]
    fn validation_rejects_missing_routing_fields() {
        let event = Event::builder("text", "", "user", Direction::Incoming).build();
        assert!(matches!(event.validate(), Err(DialogError::InvalidEvent(_))));

        let event = Event::builder("text", "web", "user", Direction::Incoming)
            .payload(json!("not an object"))
            .build();
        assert!(event.validate().is_err());

        let event = text_event(json!({"text": "ok"})).build();
        assert!(event.validate().is_ok());
    }

    #[test]
    fn direction_display_round_trips() {
        use std::str::FromStr;
        for d in [Direction::Incoming, Direction::Outgoing] {
            assert_eq!(Direction::from_str(&d.to_string()).unwrap(), d);
        }
        assert_eq!(StepStatus::TimedOut.to_string(), "timedOut");
    }
}
