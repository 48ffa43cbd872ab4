// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline metrics through the `metrics` facade.

use metrics::describe_counter;
use parley_core::{Direction, StepStatus};

/// Registers descriptions for the pipeline's metrics.
pub fn register_metrics() {
    describe_counter!("parley_events_total", "Events submitted to the engine");
    describe_counter!(
        "parley_middleware_stages_total",
        "Middleware stage outcomes by direction and status"
    );
}

pub fn record_event(direction: Direction) {
    metrics::counter!("parley_events_total", "direction" => direction.to_string()).increment(1);
}

pub fn record_stage(direction: Direction, status: StepStatus) {
    metrics::counter!(
        "parley_middleware_stages_total",
        "direction" => direction.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
