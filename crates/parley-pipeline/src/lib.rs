// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered, fault-tolerant middleware pipeline for dialog events.
//!
//! Stages run strictly one after another in ascending `order`. Each stage is
//! raced against a timeout; a stage that times out, fails, or forgets to
//! signal is recorded and the run continues. A stage that swallows the event
//! ends the run.

pub mod chain;
pub mod engine;
pub mod middleware;
pub mod recording;

pub use chain::{MiddlewareChain, RunOutcome, RunReport, StageReport};
pub use engine::{DEFAULT_STAGE_TIMEOUT, EventEngine};
pub use middleware::{MiddlewareDefinition, MiddlewareHandler, Next};
