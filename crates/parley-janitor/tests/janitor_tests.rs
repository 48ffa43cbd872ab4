// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Janitor sweeps against an in-memory store with a frozen clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parley_config::JanitorConfig;
use parley_core::{DialogError, DialogSession, Direction, SessionStore};
use parley_janitor::{DialogJanitor, TIMEOUT_EVENT_TYPE};
use parley_storage::MemorySessionStore;
use parley_test_utils::{ManualClock, ManualScheduler, RecordingSink};
use rand::SeedableRng;
use rand::rngs::StdRng;

struct Fixture {
    store: Arc<MemorySessionStore>,
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
    scheduler: Arc<ManualScheduler>,
    janitor: Arc<DialogJanitor>,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
}

fn config() -> JanitorConfig {
    JanitorConfig {
        interval_ms: 10_000,
        jitter_ms: 0,
        timeout_ms: 30_000,
        batch_size: 250,
        ..JanitorConfig::default()
    }
}

fn fixture(config: JanitorConfig) -> Fixture {
    let store = Arc::new(MemorySessionStore::new());
    let sink = Arc::new(RecordingSink::new());
    let clock = Arc::new(ManualClock::new(now()));
    let scheduler = Arc::new(ManualScheduler::new());
    let janitor = DialogJanitor::new(
        config,
        store.clone(),
        sink.clone(),
        clock.clone(),
        scheduler.clone(),
    );
    Fixture {
        store,
        sink,
        clock,
        scheduler,
        janitor,
    }
}

async fn seed(store: &MemorySessionStore, id: &str, idle_secs: i64) {
    store
        .upsert_session(&DialogSession::new(id, now() - TimeDelta::seconds(idle_secs)))
        .await
        .unwrap();
}

#[tokio::test]
async fn stale_root_gets_exactly_one_timeout_event() {
    let f = fixture(config());
    seed(&f.store, "web:alice", 120).await;
    seed(&f.store, "web:alice||survey", 120).await;
    seed(&f.store, "web:bob", 5).await;

    let report = f.janitor.run_once().await.unwrap();
    assert_eq!(report.timed_out, vec!["web:alice".to_string()]);

    let events = f.sink.events().await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.event_type, TIMEOUT_EVENT_TYPE);
    assert_eq!(event.channel, "web");
    assert_eq!(event.target, "alice");
    assert_eq!(event.direction, Direction::Incoming);
    assert_eq!(event.payload["sessionId"], "web:alice");
}

#[tokio::test]
async fn boundary_session_is_not_stale() {
    let f = fixture(config());
    seed(&f.store, "web:edge", 30).await;
    seed(&f.store, "web:past", 31).await;

    let report = f.janitor.run_once().await.unwrap();
    assert_eq!(report.timed_out, vec!["web:past".to_string()]);
}

#[tokio::test]
async fn id_without_channel_uses_fallback() {
    let f = fixture(JanitorConfig {
        fallback_channel: "api".into(),
        ..config()
    });
    seed(&f.store, "visitor-77", 600).await;

    f.janitor.run_once().await.unwrap();
    let events = f.sink.events().await;
    assert_eq!(events[0].channel, "api");
    assert_eq!(events[0].target, "visitor-77");
}

#[tokio::test]
async fn target_may_contain_colons() {
    let f = fixture(config());
    seed(&f.store, "sip:user:5060", 600).await;

    f.janitor.run_once().await.unwrap();
    let events = f.sink.events().await;
    assert_eq!(events[0].channel, "sip");
    assert_eq!(events[0].target, "user:5060");
}

#[tokio::test]
async fn one_failed_delivery_does_not_abort_the_sweep() {
    let f = fixture(config());
    seed(&f.store, "web:a", 300).await;
    seed(&f.store, "web:b", 200).await;
    seed(&f.store, "web:c", 100).await;
    f.sink.fail_target("b").await;

    let report = f.janitor.run_once().await.unwrap();
    assert_eq!(report.found, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(
        report.timed_out,
        vec!["web:a".to_string(), "web:c".to_string()]
    );
}

#[tokio::test]
async fn sweep_is_bounded_by_batch_size() {
    let f = fixture(JanitorConfig {
        batch_size: 2,
        ..config()
    });
    for (i, idle) in [400, 300, 200].into_iter().enumerate() {
        seed(&f.store, &format!("web:u{i}"), idle).await;
    }

    let report = f.janitor.run_once().await.unwrap();
    assert_eq!(report.found, 2);
    assert_eq!(
        report.timed_out,
        vec!["web:u0".to_string(), "web:u1".to_string()]
    );
}

/// Returns a fixed stale row but reports fresh activity on re-read.
struct RacingStore {
    inner: MemorySessionStore,
    stale_snapshot: DialogSession,
}

#[async_trait]
impl SessionStore for RacingStore {
    async fn find_stale_sessions(
        &self,
        _older_than: DateTime<Utc>,
        _exclude_pattern: &str,
        _limit: usize,
    ) -> Result<Vec<DialogSession>, DialogError> {
        Ok(vec![self.stale_snapshot.clone()])
    }

    async fn get_session(&self, id: &str) -> Result<Option<DialogSession>, DialogError> {
        self.inner.get_session(id).await
    }

    async fn upsert_session(&self, session: &DialogSession) -> Result<(), DialogError> {
        self.inner.upsert_session(session).await
    }

    async fn delete_session(&self, id: &str) -> Result<(), DialogError> {
        self.inner.delete_session(id).await
    }

    async fn delete_substates(&self, root_id: &str) -> Result<usize, DialogError> {
        self.inner.delete_substates(root_id).await
    }
}

async fn racing_janitor(recheck: bool) -> (Arc<DialogJanitor>, Arc<RecordingSink>) {
    let inner = MemorySessionStore::new();
    inner
        .upsert_session(&DialogSession::new("web:busy", now()))
        .await
        .unwrap();
    let store = Arc::new(RacingStore {
        inner,
        stale_snapshot: DialogSession::new("web:busy", now() - TimeDelta::hours(1)),
    });
    let sink = Arc::new(RecordingSink::new());
    let janitor = DialogJanitor::new(
        JanitorConfig {
            recheck_before_timeout: recheck,
            ..config()
        },
        store,
        sink.clone(),
        Arc::new(ManualClock::new(now())),
        Arc::new(ManualScheduler::new()),
    );
    (janitor, sink)
}

#[tokio::test]
async fn recheck_skips_sessions_that_became_active() {
    let (janitor, sink) = racing_janitor(true).await;
    let report = janitor.run_once().await.unwrap();
    assert_eq!(report.skipped, 1);
    assert!(report.timed_out.is_empty());
    assert_eq!(sink.event_count().await, 0);
}

#[tokio::test]
async fn without_recheck_the_snapshot_is_trusted() {
    let (janitor, sink) = racing_janitor(false).await;
    let report = janitor.run_once().await.unwrap();
    assert_eq!(report.timed_out, vec!["web:busy".to_string()]);
    assert_eq!(sink.event_count().await, 1);
}

#[tokio::test]
async fn install_twice_keeps_a_single_timer() {
    let f = fixture(config());
    assert!(!f.janitor.is_installed());

    f.janitor.install();
    f.janitor.install();
    assert!(f.janitor.is_installed());
    assert_eq!(f.scheduler.scheduled_count(), 2);
    assert_eq!(f.scheduler.active_count(), 1);

    assert!(f.janitor.uninstall());
    assert!(!f.janitor.uninstall());
    assert_eq!(f.scheduler.active_count(), 0);
}

#[tokio::test]
async fn install_period_includes_jitter() {
    let f = fixture(JanitorConfig {
        jitter_ms: 5_000,
        ..config()
    });
    let period = f.janitor.install_with_rng(&mut StdRng::seed_from_u64(5));
    assert!(period >= Duration::from_millis(10_000));
    assert!(period < Duration::from_millis(15_000));
    assert_eq!(f.scheduler.periods(), vec![period]);
}

#[tokio::test]
async fn timer_ticks_run_sweeps() {
    let f = fixture(config());
    f.janitor.install();
    seed(&f.store, "web:alice", 10).await;

    assert_eq!(f.scheduler.fire().await, 1);
    assert_eq!(f.sink.event_count().await, 0);

    f.clock.advance(TimeDelta::seconds(60));
    f.scheduler.fire().await;
    assert_eq!(f.sink.event_count().await, 1);
}

#[tokio::test]
async fn dropping_the_janitor_cancels_its_timer() {
    let f = fixture(config());
    f.janitor.install();
    let scheduler = f.scheduler.clone();
    drop(f);

    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.fire().await, 0);
}
