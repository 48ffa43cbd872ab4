// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for Parley integration tests.
//!
//! # Components
//!
//! - [`RecordingSink`] - Event sink that captures submitted events and can fail on demand
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`ManualScheduler`] - Scheduler whose ticks are fired by the test
//! - [`ScriptedMiddleware`] - Middleware handler that replies from a script

pub mod clock;
pub mod middleware;
pub mod scheduler;
pub mod sink;

pub use clock::ManualClock;
pub use middleware::{Reply, ScriptedMiddleware};
pub use scheduler::{ManualScheduler, ManualTimer};
pub use sink::{CapturedEvent, RecordingSink};
