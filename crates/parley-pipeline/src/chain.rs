// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One direction's ordered list of middleware and the sequential runner.
//!
//! Each stage is spawned on its own task and raced against its timeout. The
//! stage list is held in an [`ArcSwap`] so a run works on a consistent
//! snapshot without locking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use parley_core::{DialogError, Direction, Event, StepScope, StepStatus};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::middleware::{MiddlewareDefinition, Next, StageSignal};
use crate::recording;

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: String,
    pub status: StepStatus,
    pub elapsed: Duration,
}

/// Pipeline-level terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A stage swallowed the event; later stages did not run.
    Swallowed { by: String },
    /// Every enabled stage ran.
    Finished,
}

/// What happened during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn is_swallowed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Swallowed { .. })
    }

    /// Status of the named stage, if it ran.
    pub fn status_of(&self, name: &str) -> Option<StepStatus> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.status)
    }
}

/// The middleware list for a single direction.
pub struct MiddlewareChain {
    direction: Direction,
    default_timeout: Duration,
    stages: ArcSwap<Vec<Arc<MiddlewareDefinition>>>,
    /// Serializes writers; readers never take it.
    write_lock: Mutex<()>,
}

impl MiddlewareChain {
    pub fn new(direction: Direction, default_timeout: Duration) -> Self {
        Self {
            direction,
            default_timeout,
            stages: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Inserts a definition after every stage of equal or lower order.
    pub fn register(&self, definition: MiddlewareDefinition) -> Result<(), DialogError> {
        if definition.direction != self.direction {
            return Err(DialogError::InvalidMiddleware(format!(
                "`{}` is an {} middleware, not {}",
                definition.name, definition.direction, self.direction
            )));
        }
        if definition.name.trim().is_empty() {
            return Err(DialogError::InvalidMiddleware(
                "middleware name must not be empty".into(),
            ));
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let current = self.stages.load();
        if current.iter().any(|m| m.name == definition.name) {
            return Err(DialogError::InvalidMiddleware(format!(
                "{} middleware `{}` is already registered",
                self.direction, definition.name
            )));
        }

        let mut updated = Vec::clone(&current);
        let position = updated.partition_point(|m| m.order <= definition.order);
        debug!(
            middleware = %definition.name,
            direction = %self.direction,
            order = definition.order,
            position,
            "registered middleware"
        );
        updated.insert(position, Arc::new(definition));
        self.stages.store(Arc::new(updated));
        Ok(())
    }

    /// Removes a definition by name. Returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let current = self.stages.load();
        if !current.iter().any(|m| m.name == name) {
            return false;
        }
        let updated: Vec<_> = current
            .iter()
            .filter(|m| m.name != name)
            .cloned()
            .collect();
        self.stages.store(Arc::new(updated));
        true
    }

    /// Registered names in execution order, disabled ones included.
    pub fn names(&self) -> Vec<String> {
        self.stages.load().iter().map(|m| m.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.load().is_empty()
    }

    /// Runs every enabled stage in order until one swallows the event.
    ///
    /// Never fails: timeouts and handler failures are recorded and the run
    /// moves on.
    pub async fn run(&self, event: Arc<Event>) -> RunReport {
        let snapshot = self.stages.load_full();
        let mut stages = Vec::with_capacity(snapshot.len());

        for definition in snapshot.iter().filter(|m| m.enabled) {
            event.add_step(StepScope::Middleware, &definition.name, StepStatus::Started);
            let started = Instant::now();
            let status = self.run_stage(definition, &event).await;

            event.add_step(StepScope::Middleware, &definition.name, status);
            recording::record_stage(self.direction, status);
            stages.push(StageReport {
                name: definition.name.clone(),
                status,
                elapsed: started.elapsed(),
            });

            if status == StepStatus::Swallowed {
                debug!(
                    event_id = event.id,
                    middleware = %definition.name,
                    "event swallowed"
                );
                return RunReport {
                    outcome: RunOutcome::Swallowed {
                        by: definition.name.clone(),
                    },
                    stages,
                };
            }
        }

        RunReport {
            outcome: RunOutcome::Finished,
            stages,
        }
    }

    async fn run_stage(&self, definition: &MiddlewareDefinition, event: &Arc<Event>) -> StepStatus {
        let timeout = definition.timeout.unwrap_or(self.default_timeout);
        let (next, rx) = Next::channel();

        let handler = Arc::clone(&definition.handler);
        let stage_event = Arc::clone(event);
        tokio::spawn(async move { handler.handle(stage_event, next).await });

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(StageSignal::Completed)) => StepStatus::Completed,
            Ok(Ok(StageSignal::Swallowed)) => StepStatus::Swallowed,
            Ok(Ok(StageSignal::Skipped)) => StepStatus::Skipped,
            Ok(Ok(StageSignal::Failed(message))) => {
                let error = DialogError::HandlerFailure {
                    middleware: definition.name.clone(),
                    message,
                };
                warn!(event_id = event.id, error = %error, "middleware failed, continuing");
                StepStatus::Error
            }
            Ok(Err(_)) => {
                // Handler returned or panicked without signalling.
                warn!(
                    event_id = event.id,
                    middleware = %definition.name,
                    "middleware dropped its completion handle, continuing"
                );
                StepStatus::Error
            }
            Err(_) => {
                warn!(
                    event_id = event.id,
                    middleware = %definition.name,
                    timeout_ms = timeout.as_millis() as u64,
                    "middleware timed out, continuing"
                );
                StepStatus::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tracing_test::traced_test;

    const TIMEOUT: Duration = Duration::from_millis(2000);

    type Log = Arc<StdMutex<Vec<String>>>;

    fn event(debug: bool) -> Arc<Event> {
        Arc::new(
            Event::builder("text", "web", "user-1", Direction::Incoming)
                .debug(debug)
                .build(),
        )
    }

    /// A middleware that logs its name then signals with `signal`.
    fn recording(
        name: &str,
        order: i32,
        log: &Log,
        signal: fn(Next),
    ) -> MiddlewareDefinition {
        let log = Arc::clone(log);
        let label = name.to_string();
        MiddlewareDefinition::new(name, Direction::Incoming, move |_e: Arc<Event>, next: Next| {
            let log = Arc::clone(&log);
            let label = label.clone();
            async move {
                log.lock().unwrap().push(label);
                signal(next);
            }
        })
        .with_order(order)
    }

    fn chain() -> MiddlewareChain {
        MiddlewareChain::new(Direction::Incoming, TIMEOUT)
    }

    #[tokio::test]
    async fn stages_run_in_ascending_order_with_stable_ties() {
        let log = Log::default();
        let c = chain();
        c.register(recording("c", 10, &log, Next::proceed)).unwrap();
        c.register(recording("a", -1, &log, Next::proceed)).unwrap();
        c.register(recording("b1", 5, &log, Next::proceed)).unwrap();
        c.register(recording("b2", 5, &log, Next::skip)).unwrap();

        assert_eq!(c.names(), vec!["a", "b1", "b2", "c"]);
        let report = c.run(event(false)).await;

        assert_eq!(*log.lock().unwrap(), vec!["a", "b1", "b2", "c"]);
        assert_eq!(report.outcome, RunOutcome::Finished);
        assert_eq!(report.status_of("b2"), Some(StepStatus::Skipped));
    }

    #[tokio::test]
    async fn swallow_stops_later_stages() {
        let log = Log::default();
        let c = chain();
        c.register(recording("first", 0, &log, Next::swallow)).unwrap();
        c.register(recording("second", 1, &log, Next::proceed)).unwrap();

        let report = c.run(event(false)).await;
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
        assert_eq!(
            report.outcome,
            RunOutcome::Swallowed {
                by: "first".into()
            }
        );
        assert_eq!(report.stages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_stage_times_out_and_run_proceeds() {
        let log = Log::default();
        let c = chain();
        c.register(MiddlewareDefinition::new(
            "silent",
            Direction::Incoming,
            |_e: Arc<Event>, next: Next| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                next.proceed();
            },
        ))
        .unwrap();
        c.register(recording("after", 1, &log, Next::proceed)).unwrap();

        let started = Instant::now();
        let report = c.run(event(true)).await;

        assert_eq!(report.status_of("silent"), Some(StepStatus::TimedOut));
        assert_eq!(report.status_of("after"), Some(StepStatus::Completed));
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
        assert!(started.elapsed() >= TIMEOUT);
        assert!(started.elapsed() < TIMEOUT * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn per_definition_timeout_overrides_default() {
        let c = chain();
        c.register(
            MiddlewareDefinition::new(
                "slow",
                Direction::Incoming,
                |_e: Arc<Event>, next: Next| async move {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    next.proceed();
                },
            )
            .with_timeout(Duration::from_millis(100)),
        )
        .unwrap();

        let report = c.run(event(false)).await;
        assert_eq!(report.status_of("slow"), Some(StepStatus::TimedOut));
        assert!(report.stages[0].elapsed < Duration::from_millis(200));
    }

    #[tokio::test]
    #[traced_test]
    async fn failures_are_logged_and_skipped_over() {
        let log = Log::default();
        let c = chain();
        c.register(recording("fails", 0, &log, |n| n.fail("db unavailable")))
            .unwrap();
        c.register(MiddlewareDefinition::new(
            "forgets",
            Direction::Incoming,
            |_e: Arc<Event>, _next: Next| async move {},
        )
        .with_order(1))
        .unwrap();
        c.register(MiddlewareDefinition::new(
            "panics",
            Direction::Incoming,
            |_e: Arc<Event>, _next: Next| async move { panic!("handler bug") },
        )
        .with_order(2))
        .unwrap();
        c.register(recording("last", 3, &log, Next::proceed)).unwrap();

        let report = c.run(event(false)).await;

        assert_eq!(report.status_of("fails"), Some(StepStatus::Error));
        assert_eq!(report.status_of("forgets"), Some(StepStatus::Error));
        assert_eq!(report.status_of("panics"), Some(StepStatus::Error));
        assert_eq!(report.status_of("last"), Some(StepStatus::Completed));
        assert!(logs_contain("db unavailable"));
        assert!(logs_contain("dropped its completion handle"));
    }

    #[tokio::test]
    async fn disabled_middleware_never_runs() {
        let log = Log::default();
        let c = chain();
        c.register(recording("off", 0, &log, Next::proceed).enabled(false))
            .unwrap();
        c.register(recording("on", 1, &log, Next::proceed)).unwrap();

        let report = c.run(event(false)).await;
        assert_eq!(*log.lock().unwrap(), vec!["on"]);
        assert_eq!(report.status_of("off"), None);
    }

    #[tokio::test]
    async fn trace_is_written_only_when_debugging() {
        let log = Log::default();
        let c = chain();
        c.register(recording("auth", 0, &log, Next::proceed)).unwrap();

        let quiet = event(false);
        c.run(Arc::clone(&quiet)).await;
        assert!(quiet.processing().is_none());

        let traced = event(true);
        c.run(Arc::clone(&traced)).await;
        let trace = traced.processing().unwrap();
        assert!(trace.contains_key("mw:auth:started"));
        assert!(trace.contains_key("mw:auth:completed"));
    }

    #[test]
    fn registration_rules() {
        let log = Log::default();
        let c = chain();
        c.register(recording("auth", 0, &log, Next::proceed)).unwrap();

        assert!(matches!(
            c.register(recording("auth", 3, &log, Next::proceed)),
            Err(DialogError::InvalidMiddleware(_))
        ));
        assert!(c.register(recording(" ", 3, &log, Next::proceed)).is_err());

        let mut outgoing = recording("send", 0, &log, Next::proceed);
        outgoing.direction = Direction::Outgoing;
        assert!(c.register(outgoing).is_err());

        assert!(c.remove("auth"));
        assert!(!c.remove("auth"));
        assert!(c.is_empty());
    }
}
