// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler whose timers only tick when the test says so.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley_core::{ScheduledTask, Scheduler, TimerHandle};

/// Cancellation flag shared between the scheduler and the returned handle.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle for ManualTimer {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct Registration {
    period: Duration,
    task: ScheduledTask,
    timer: ManualTimer,
}

/// Records every timer it hands out.
///
/// [`fire`](ManualScheduler::fire) runs one tick of every timer that has not
/// been cancelled.
#[derive(Default)]
pub struct ManualScheduler {
    registrations: Mutex<Vec<Registration>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
    }

    /// Timers ever scheduled.
    pub fn scheduled_count(&self) -> usize {
        self.lock().len()
    }

    pub fn cancelled_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|r| r.timer.is_cancelled())
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.scheduled_count() - self.cancelled_count()
    }

    /// Periods of every scheduled timer, in scheduling order.
    pub fn periods(&self) -> Vec<Duration> {
        self.lock().iter().map(|r| r.period).collect()
    }

    /// Runs one tick of each active timer, in scheduling order. Returns how
    /// many ticks ran.
    pub async fn fire(&self) -> usize {
        let tasks: Vec<ScheduledTask> = self
            .lock()
            .iter()
            .filter(|r| !r.timer.is_cancelled())
            .map(|r| Arc::clone(&r.task))
            .collect();
        let count = tasks.len();
        for task in tasks {
            task().await;
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, task: ScheduledTask) -> Box<dyn TimerHandle> {
        let timer = ManualTimer::default();
        self.lock().push(Registration {
            period,
            task,
            timer: timer.clone(),
        });
        Box::new(timer)
    }
}
