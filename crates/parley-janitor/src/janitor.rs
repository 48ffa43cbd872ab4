// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dialog session janitor.
//!
//! Lifecycle is `Stopped -> Installed -> Stopped`. While installed, a single
//! repeating timer calls [`DialogJanitor::run_once`], which finds sessions
//! idle for longer than the configured timeout and feeds a synthetic
//! `dialog_timeout` event for each into the incoming pipeline.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parley_config::JanitorConfig;
use parley_core::{
    Clock, DialogError, DialogSession, Direction, Event, EventSink, SUBSTATE_DELIMITER,
    ScheduledTask, Scheduler, SessionStore, TickFuture, TimerHandle,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::recording;

/// Type of the synthetic event emitted for a stale session.
pub const TIMEOUT_EVENT_TYPE: &str = "dialog_timeout";

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rows returned by the store.
    pub found: usize,
    /// Raw ids of sessions a timeout event was delivered for.
    pub timed_out: Vec<String>,
    /// Substates, and sessions that became active or vanished before emission.
    pub skipped: usize,
    /// Sessions whose re-check or delivery failed.
    pub failed: usize,
}

/// Sweeps a session store for stale sessions.
pub struct DialogJanitor {
    config: JanitorConfig,
    store: Arc<dyn SessionStore>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    timer: Mutex<Option<Box<dyn TimerHandle>>>,
}

impl DialogJanitor {
    pub fn new(
        config: JanitorConfig,
        store: Arc<dyn SessionStore>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            sink,
            clock,
            scheduler,
            timer: Mutex::new(None),
        })
    }

    /// Starts the sweep timer, replacing any timer already running.
    ///
    /// The period is the base interval plus a jitter drawn in
    /// `[0, jitter_ms)`, recomputed on every install. Returns that period.
    pub fn install(self: &Arc<Self>) -> Duration {
        self.install_with_rng(&mut rand::thread_rng())
    }

    /// [`install`](Self::install) with a caller-supplied jitter source.
    pub fn install_with_rng<R: Rng + ?Sized>(self: &Arc<Self>, rng: &mut R) -> Duration {
        let period = sweep_period(&self.config, rng);
        let task = sweep_task(Arc::downgrade(self));

        let mut slot = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = slot.take() {
            previous.cancel();
            debug!("replaced existing janitor timer");
        }
        *slot = Some(self.scheduler.schedule_repeating(period, task));

        info!(
            interval_ms = period.as_millis() as u64,
            timeout_ms = self.config.timeout_ms,
            batch_size = self.config.batch_size,
            "dialog janitor installed"
        );
        period
    }

    /// Stops the sweep timer. Returns whether one was running.
    pub fn uninstall(&self) -> bool {
        let mut slot = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        match slot.take() {
            Some(timer) => {
                timer.cancel();
                info!("dialog janitor uninstalled");
                true
            }
            None => false,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    /// Runs one sweep.
    ///
    /// Only the initial store query can fail the sweep. Per-session failures
    /// are logged, counted, and the sweep moves on.
    pub async fn run_once(&self) -> Result<SweepReport, DialogError> {
        let cutoff = self.cutoff();
        let stale = self
            .store
            .find_stale_sessions(cutoff, SUBSTATE_DELIMITER, self.config.batch_size)
            .await?;

        let mut report = SweepReport {
            found: stale.len(),
            ..SweepReport::default()
        };

        for session in stale {
            let id = session.session_id();
            // Substates are only ever timed out through their root.
            if id.is_substate() {
                report.skipped += 1;
                continue;
            }

            if self.config.recheck_before_timeout {
                match self.still_stale(&session, cutoff).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(session_id = %session.id, "session no longer stale, skipping");
                        report.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(session_id = %session.id, error = %e, "session re-check failed");
                        recording::record_failure();
                        report.failed += 1;
                        continue;
                    }
                }
            }

            let event = Event::builder(
                TIMEOUT_EVENT_TYPE,
                id.channel_or(&self.config.fallback_channel),
                id.target(),
                Direction::Incoming,
            )
            .payload(serde_json::json!({ "sessionId": session.id }))
            .build();

            match self.sink.send_event(event).await {
                Ok(()) => {
                    recording::record_timeout();
                    report.timed_out.push(session.id);
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "failed to deliver timeout event");
                    recording::record_failure();
                    report.failed += 1;
                }
            }
        }

        if report.found > 0 {
            info!(
                found = report.found,
                timed_out = report.timed_out.len(),
                skipped = report.skipped,
                failed = report.failed,
                "janitor sweep finished"
            );
        }
        Ok(report)
    }

    fn cutoff(&self) -> DateTime<Utc> {
        let timeout =
            TimeDelta::from_std(self.config.session_timeout()).unwrap_or(TimeDelta::MAX);
        self.clock
            .now()
            .checked_sub_signed(timeout)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    async fn still_stale(
        &self,
        session: &DialogSession,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, DialogError> {
        Ok(self
            .store
            .get_session(&session.id)
            .await?
            .is_some_and(|current| current.is_stale(cutoff)))
    }
}

impl Drop for DialogJanitor {
    fn drop(&mut self) {
        let slot = self.timer.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(timer) = slot.take() {
            timer.cancel();
        }
    }
}

fn sweep_period<R: Rng + ?Sized>(config: &JanitorConfig, rng: &mut R) -> Duration {
    let jitter = if config.jitter_ms > 0 {
        rng.gen_range(0..config.jitter_ms)
    } else {
        0
    };
    config
        .interval()
        .saturating_add(Duration::from_millis(jitter))
}

/// The timer holds only a weak reference, so a dropped janitor stops sweeping.
fn sweep_task(janitor: Weak<DialogJanitor>) -> ScheduledTask {
    Arc::new(move || -> TickFuture {
        let janitor = janitor.clone();
        Box::pin(async move {
            let Some(janitor) = janitor.upgrade() else {
                return;
            };
            if let Err(e) = janitor.run_once().await {
                warn!(error = %e, "janitor sweep failed");
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parley_storage::MemorySessionStore;
    use parley_test_utils::{ManualClock, ManualScheduler, RecordingSink};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tracing_test::traced_test;

    #[test]
    fn period_adds_bounded_jitter() {
        let config = JanitorConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let period = sweep_period(&config, &mut rng);
            assert!(period >= Duration::from_millis(10_000));
            assert!(period < Duration::from_millis(15_000));
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let config = JanitorConfig {
            jitter_ms: 0,
            interval_ms: 250,
            ..JanitorConfig::default()
        };
        let period = sweep_period(&config, &mut StdRng::seed_from_u64(0));
        assert_eq!(period, Duration::from_millis(250));
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_delivery_is_logged_and_counted() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let store = Arc::new(MemorySessionStore::new());
        store
            .upsert_session(&DialogSession::new("web:alice", now - TimeDelta::hours(2)))
            .await
            .unwrap();
        let sink = Arc::new(RecordingSink::new());
        sink.fail_target("alice").await;

        let janitor = DialogJanitor::new(
            JanitorConfig::default(),
            store,
            sink,
            Arc::new(ManualClock::new(now)),
            Arc::new(ManualScheduler::new()),
        );
        let report = janitor.run_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert!(logs_contain("failed to deliver timeout event"));
        assert!(logs_contain("janitor sweep finished"));
    }
}
