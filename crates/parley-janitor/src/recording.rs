// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Janitor metrics.

use metrics::describe_counter;

pub fn register_metrics() {
    describe_counter!(
        "parley_janitor_timeouts_total",
        "Timeout events emitted for stale sessions"
    );
    describe_counter!(
        "parley_janitor_failures_total",
        "Stale sessions the janitor failed to time out"
    );
}

pub fn record_timeout() {
    metrics::counter!("parley_janitor_timeouts_total").increment(1);
}

pub fn record_failure() {
    metrics::counter!("parley_janitor_failures_total").increment(1);
}
