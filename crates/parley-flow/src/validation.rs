// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Save-time checks for flow definitions.

use std::collections::HashSet;

use parley_core::DialogError;

use crate::condition::Condition;
use crate::instruction::parse_instruction;
use crate::model::{Flow, Transition};
use crate::target::TransitionTarget;

/// Checks a flow for authoring errors, collecting all of them.
///
/// Unwired transitions are reported as [`DialogError::UnresolvedTransition`]:
/// a saved flow must have every outlet assigned.
pub fn validate_flow(flow: &Flow) -> Result<(), Vec<DialogError>> {
    let mut errors = Vec::new();
    let invalid = |message: String| DialogError::InvalidFlow {
        flow: flow.name.clone(),
        message,
    };

    if flow.nodes.is_empty() {
        errors.push(invalid("flow has no nodes".into()));
    }

    let mut names = HashSet::new();
    for node in &flow.nodes {
        if node.name.trim().is_empty() {
            errors.push(invalid("a node has an empty name".into()));
        } else if !names.insert(node.name.as_str()) {
            errors.push(invalid(format!("duplicate node name `{}`", node.name)));
        }
    }

    if !flow.nodes.is_empty() && !names.contains(flow.start_node.as_str()) {
        errors.push(invalid(format!(
            "start node `{}` does not exist",
            flow.start_node
        )));
    }
    if let Some(timeout) = &flow.timeout_node {
        if !names.contains(timeout.as_str()) {
            errors.push(invalid(format!("timeout node `{timeout}` does not exist")));
        }
    }

    for node in &flow.nodes {
        let instructions = node
            .on_enter
            .iter()
            .chain(node.on_receive.iter().flatten());
        for instruction in instructions {
            if let Err(e) = parse_instruction(instruction) {
                errors.push(e);
            }
        }
        for transition in &node.next {
            check_transition(flow, &node.name, transition, &names, &mut errors);
        }
    }
    for transition in flow.catch_all.iter().flatten() {
        check_transition(flow, "catchAll", transition, &names, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_transition(
    flow: &Flow,
    node: &str,
    transition: &Transition,
    names: &HashSet<&str>,
    errors: &mut Vec<DialogError>,
) {
    if let Err(e) = Condition::parse(&transition.condition) {
        errors.push(e);
    }

    match TransitionTarget::parse(&transition.node) {
        TransitionTarget::Unwired => errors.push(DialogError::UnresolvedTransition {
            flow: flow.name.clone(),
            node: node.to_string(),
            caption: transition.caption.clone(),
        }),
        TransitionTarget::Node(target) if !names.contains(target.as_str()) => {
            errors.push(DialogError::InvalidFlow {
                flow: flow.name.clone(),
                message: format!("node `{node}` transitions to unknown node `{target}`"),
            })
        }
        _ => {}
    }
}
