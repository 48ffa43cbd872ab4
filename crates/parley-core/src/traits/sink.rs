// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event delivery contract.

use async_trait::async_trait;

use crate::error::DialogError;
use crate::event::Event;

/// Anything that accepts events for processing, typically the event engine.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Submits an event and waits until its pipeline run completes.
    async fn send_event(&self, event: Event) -> Result<(), DialogError>;
}
