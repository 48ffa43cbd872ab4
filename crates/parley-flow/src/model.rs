// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical flow graph consumed by the dialog interpreter.
//!
//! The JSON shape (camelCase keys) is the on-disk flow format shared with
//! flow editors.

use serde::{Deserialize, Serialize};

/// Version assigned to flows that do not declare one.
pub const BASELINE_FLOW_VERSION: &str = "0.1";

fn default_version() -> String {
    BASELINE_FLOW_VERSION.to_string()
}

/// A named, versioned directed graph of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    pub start_node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_node: Option<String>,
    /// Fallback transitions evaluated when no node-level transition matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch_all: Option<Vec<Transition>>,
    pub nodes: Vec<FlowNode>,
}

impl Flow {
    /// Looks up a node by name.
    pub fn node(&self, name: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn start(&self) -> Option<&FlowNode> {
        self.node(&self.start_node)
    }
}

/// One node of a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Internal identifier, unique within the flow.
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Instructions run once when the node is entered.
    #[serde(default)]
    pub on_enter: Vec<String>,
    /// Instructions run when input arrives. `None` means the node never waits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_receive: Option<Vec<String>>,
    /// Outgoing transitions; the first whose condition holds wins.
    #[serde(default)]
    pub next: Vec<Transition>,
}

impl FlowNode {
    pub fn waits_for_input(&self) -> bool {
        self.on_receive.is_some()
    }
}

/// A guarded edge to another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(default)]
    pub caption: String,
    /// Guard expression. Empty, `true` and `yes` are unconditional.
    #[serde(default)]
    pub condition: String,
    /// Raw target, see [`crate::TransitionTarget`].
    #[serde(default)]
    pub node: String,
}

impl Transition {
    pub fn new(
        caption: impl Into<String>,
        condition: impl Into<String>,
        node: impl Into<String>,
    ) -> Self {
        Self {
            caption: caption.into(),
            condition: condition.into(),
            node: node.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_editor_json_with_defaults() {
        let flow: Flow = serde_json::from_value(json!({
            "name": "main.flow.json",
            "startNode": "entry",
            "nodes": [
                { "name": "entry", "onEnter": ["say #builtin_text hello"] },
                { "name": "ask", "onReceive": [], "next": [
                    { "caption": "always", "condition": "true", "node": "#" }
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(flow.version, BASELINE_FLOW_VERSION);
        assert!(flow.catch_all.is_none());
        let entry = flow.start().unwrap();
        assert!(!entry.waits_for_input());
        assert!(entry.next.is_empty());
        assert!(flow.node("ask").unwrap().waits_for_input());
    }

    #[test]
    fn serializes_camel_case_and_omits_absent_receive() {
        let node = FlowNode {
            id: "abc".into(),
            name: "entry".into(),
            on_enter: vec![],
            on_receive: None,
            next: vec![],
        };
        let value = serde_json::to_value(&node).unwrap();
        assert!(value.get("onEnter").is_some());
        assert!(value.get("onReceive").is_none());
    }
}
