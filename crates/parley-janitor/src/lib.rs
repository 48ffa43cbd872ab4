// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session janitor for the Parley dialog core.
//!
//! [`DialogJanitor`] periodically asks the [`SessionStore`](parley_core::SessionStore)
//! for sessions idle beyond the configured timeout and emits one
//! `dialog_timeout` event per root session through an
//! [`EventSink`](parley_core::EventSink). [`TokioScheduler`] provides the
//! production timer.

pub mod janitor;
pub mod recording;
pub mod scheduler;

pub use janitor::{DialogJanitor, SweepReport, TIMEOUT_EVENT_TYPE};
pub use scheduler::{CancellableTimer, TokioScheduler};
