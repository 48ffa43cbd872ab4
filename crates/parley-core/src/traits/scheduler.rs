// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repeating-timer abstraction used by background sweeps.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Future produced by one tick of a scheduled task.
pub type TickFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A task run on every tick.
pub type ScheduledTask = Arc<dyn Fn() -> TickFuture + Send + Sync>;

/// Handle to a scheduled timer.
pub trait TimerHandle: Send + Sync {
    /// Stops future ticks. A tick already running completes.
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

/// Runs a task repeatedly.
pub trait Scheduler: Send + Sync {
    /// Runs `task` every `period`, first after one full period.
    fn schedule_repeating(&self, period: Duration, task: ScheduledTask) -> Box<dyn TimerHandle>;
}
