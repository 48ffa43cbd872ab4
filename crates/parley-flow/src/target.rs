// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of a transition's `node` field.

use std::fmt;

const RETURN_TO_CALLER: &str = "#";
const FLOW_NODE_SEPARATOR: char = '#';

/// Where a transition leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionTarget {
    /// A node of the same flow.
    Node(String),
    /// `#`: leave this flow and resume the calling one.
    ReturnToCaller,
    /// `""`: not wired yet; the embedding caller must assign a target.
    Unwired,
    /// `otherFlow#node`: jump to a node of another flow. An empty node means
    /// that flow's start node.
    CrossFlow { flow: String, node: String },
}

impl TransitionTarget {
    /// Decodes a raw target. Every string decodes to some target.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return TransitionTarget::Unwired;
        }
        if raw == RETURN_TO_CALLER {
            return TransitionTarget::ReturnToCaller;
        }
        match raw.split_once(FLOW_NODE_SEPARATOR) {
            Some((flow, node)) if !flow.is_empty() => TransitionTarget::CrossFlow {
                flow: flow.to_string(),
                node: node.to_string(),
            },
            _ => TransitionTarget::Node(raw.to_string()),
        }
    }

    pub fn is_unwired(&self) -> bool {
        matches!(self, TransitionTarget::Unwired)
    }
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionTarget::Node(node) => f.write_str(node),
            TransitionTarget::ReturnToCaller => f.write_str(RETURN_TO_CALLER),
            TransitionTarget::Unwired => Ok(()),
            TransitionTarget::CrossFlow { flow, node } => {
                write!(f, "{flow}{FLOW_NODE_SEPARATOR}{node}")
            }
        }
    }
}
