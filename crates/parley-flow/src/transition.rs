// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Picking the transition to follow out of a node.

use parley_core::DialogError;

use crate::condition::{Condition, Operation};
use crate::model::{Flow, FlowNode, Transition};
use crate::target::TransitionTarget;

/// Decides whether a parsed operation holds, ignoring its negation.
pub trait ConditionEvaluator {
    fn evaluate(&self, operation: &Operation) -> bool;
}

impl<F> ConditionEvaluator for F
where
    F: Fn(&Operation) -> bool,
{
    fn evaluate(&self, operation: &Operation) -> bool {
        self(operation)
    }
}

/// The transition chosen out of a node, with its decoded target.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTransition<'a> {
    pub transition: &'a Transition,
    pub target: TransitionTarget,
    /// True when the match came from the flow's catch-all list.
    pub from_catch_all: bool,
}

/// Returns the first transition of `node` whose guard holds, falling back to
/// the flow's catch-all list.
///
/// Reaching an unwired target is an [`DialogError::UnresolvedTransition`].
pub fn select_transition<'a, E>(
    flow: &'a Flow,
    node: &'a FlowNode,
    evaluator: &E,
) -> Result<Option<SelectedTransition<'a>>, DialogError>
where
    E: ConditionEvaluator + ?Sized,
{
    let candidates = node
        .next
        .iter()
        .map(|t| (t, false))
        .chain(flow.catch_all.iter().flatten().map(|t| (t, true)));

    for (transition, from_catch_all) in candidates {
        let holds = match Condition::parse(&transition.condition)? {
            Condition::Always => true,
            Condition::Operation(op) => evaluator.evaluate(&op) != op.negate,
        };
        if !holds {
            continue;
        }

        let target = TransitionTarget::parse(&transition.node);
        if target.is_unwired() {
            return Err(DialogError::UnresolvedTransition {
                flow: flow.name.clone(),
                node: node.name.clone(),
                caption: transition.caption.clone(),
            });
        }
        return Ok(Some(SelectedTransition {
            transition,
            target,
            from_catch_all,
        }));
    }
    Ok(None)
}
