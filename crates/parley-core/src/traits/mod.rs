// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the dialog core is written against.

pub mod clock;
pub mod scheduler;
pub mod sink;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use scheduler::{ScheduledTask, Scheduler, TickFuture, TimerHandle};
pub use sink::EventSink;
pub use store::SessionStore;
