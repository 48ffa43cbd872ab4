// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tokio-backed [`Scheduler`].

use std::time::Duration;

use parley_core::{ScheduledTask, Scheduler, TimerHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs scheduled tasks on a Tokio interval.
///
/// Ticks run inline in the timer task, so a slow tick delays the next one
/// instead of overlapping it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

/// A timer backed by a [`CancellationToken`].
#[derive(Debug, Clone)]
pub struct CancellableTimer {
    token: CancellationToken,
}

impl TimerHandle for CancellableTimer {
    fn cancel(&self) {
        self.token.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, task: ScheduledTask) -> Box<dyn TimerHandle> {
        let token = CancellationToken::new();
        let cancel = token.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first immediate tick.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => task().await,
                    _ = cancel.cancelled() => {
                        debug!("scheduled timer cancelled");
                        break;
                    }
                }
            }
        });

        Box::new(CancellableTimer { token })
    }
}
