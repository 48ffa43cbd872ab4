// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lowers a skill's partial flow into the canonical [`Flow`].
//!
//! Randomness (node ids, synthesized flow names) comes from a caller-supplied
//! [`Rng`], so a seeded generator makes the output reproducible.

use parley_core::DialogError;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::debug;

use crate::instruction::{Action, serialize_actions};
use crate::model::{BASELINE_FLOW_VERSION, Flow, FlowNode, Transition};

/// Length of generated node ids and flow-name tokens.
const SHORT_ID_LEN: usize = 10;

/// A node as written by a skill. Omitted fields are defaulted on finalize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillFlowNode {
    pub name: String,
    pub on_enter: Option<Vec<Action>>,
    /// `None` means the node does not wait for input.
    pub on_receive: Option<Vec<Action>>,
    pub next: Option<Vec<Transition>>,
}

impl SkillFlowNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A partially specified flow produced by a skill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillFlow {
    pub name: Option<String>,
    pub location: Option<String>,
    pub version: Option<String>,
    pub start_node: Option<String>,
    pub timeout_node: Option<String>,
    pub catch_all: Option<Vec<Transition>>,
    pub nodes: Vec<SkillFlowNode>,
}

/// What a skill generator returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowGenerationResult {
    pub flow: SkillFlow,
    /// Outlets for the embedding flow. Targets are usually left unwired.
    pub transitions: Vec<Transition>,
    /// Optional human-readable summary for editors.
    pub preview: Option<String>,
}

/// A skill flow after defaulting and instruction serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedFlow {
    pub flow: Flow,
    pub transitions: Vec<Transition>,
    pub preview: Option<String>,
}

/// Finalizes with the thread-local generator.
pub fn finalize_flow(partial: FlowGenerationResult) -> Result<FinalizedFlow, DialogError> {
    finalize_flow_with_rng(partial, &mut rand::thread_rng())
}

/// Defaults every omitted field and serializes node actions.
///
/// Fails with [`DialogError::EmptySkillFlow`] when the skill produced no node.
pub fn finalize_flow_with_rng<R: Rng + ?Sized>(
    partial: FlowGenerationResult,
    rng: &mut R,
) -> Result<FinalizedFlow, DialogError> {
    let FlowGenerationResult {
        flow: skill_flow,
        transitions,
        preview,
    } = partial;

    let Some(first) = skill_flow.nodes.first() else {
        return Err(DialogError::EmptySkillFlow);
    };
    let start_node = skill_flow
        .start_node
        .unwrap_or_else(|| first.name.clone());

    let nodes: Vec<FlowNode> = skill_flow
        .nodes
        .into_iter()
        .map(|node| FlowNode {
            id: short_id(rng),
            name: node.name,
            on_enter: serialize_actions(node.on_enter.as_deref()).unwrap_or_default(),
            on_receive: serialize_actions(node.on_receive.as_deref()),
            next: node.next.unwrap_or_default(),
        })
        .collect();

    let (name, location) = match (skill_flow.name, skill_flow.location) {
        (Some(name), Some(location)) => (name, location),
        (name, location) => {
            let synthesized = format!("{}.flow.json", short_id(rng));
            (
                name.unwrap_or_else(|| synthesized.clone()),
                location.unwrap_or(synthesized),
            )
        }
    };

    debug!(flow = %name, nodes = nodes.len(), "finalized skill flow");

    Ok(FinalizedFlow {
        flow: Flow {
            name,
            location: Some(location),
            version: skill_flow
                .version
                .unwrap_or_else(|| BASELINE_FLOW_VERSION.to_string()),
            start_node,
            timeout_node: skill_flow.timeout_node,
            catch_all: skill_flow.catch_all,
            nodes,
        },
        transitions,
        preview,
    })
}

fn short_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SHORT_ID_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn single_node() -> FlowGenerationResult {
        FlowGenerationResult {
            flow: SkillFlow {
                nodes: vec![SkillFlowNode::new("entry")],
                ..SkillFlow::default()
            },
            ..FlowGenerationResult::default()
        }
    }

    /// Blanks every generated id so flows can be compared structurally.
    fn without_ids(mut flow: Flow) -> Flow {
        for node in &mut flow.nodes {
            node.id.clear();
        }
        flow.name.clear();
        flow.location = None;
        flow
    }

    #[test]
    fn empty_skill_flow_is_rejected() {
        let err = finalize_flow(FlowGenerationResult::default()).unwrap_err();
        assert!(matches!(err, DialogError::EmptySkillFlow));
    }

    #[test]
    fn single_node_gets_all_defaults() {
        let result = finalize_flow_with_rng(single_node(), &mut StdRng::seed_from_u64(1)).unwrap();
        let flow = result.flow;

        assert_eq!(flow.start_node, "entry");
        assert_eq!(flow.version, BASELINE_FLOW_VERSION);
        assert!(flow.name.ends_with(".flow.json"));
        assert_eq!(flow.location.as_deref(), Some(flow.name.as_str()));

        let node = &flow.nodes[0];
        assert_eq!(node.id.len(), SHORT_ID_LEN);
        assert!(node.on_enter.is_empty());
        assert!(node.on_receive.is_none());
        assert!(node.next.is_empty());
    }

    #[test]
    fn same_seed_same_flow() {
        let a = finalize_flow_with_rng(single_node(), &mut StdRng::seed_from_u64(9)).unwrap();
        let b = finalize_flow_with_rng(single_node(), &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ_only_in_ids() {
        let a = finalize_flow_with_rng(single_node(), &mut StdRng::seed_from_u64(1)).unwrap();
        let b = finalize_flow_with_rng(single_node(), &mut StdRng::seed_from_u64(2)).unwrap();
        assert_ne!(a.flow.nodes[0].id, b.flow.nodes[0].id);
        assert_eq!(without_ids(a.flow), without_ids(b.flow));
    }

    #[test]
    fn node_ids_are_distinct() {
        let mut partial = single_node();
        partial.flow.nodes = (0..50)
            .map(|i| SkillFlowNode::new(format!("n{i}")))
            .collect();
        let flow = finalize_flow_with_rng(partial, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .flow;
        let mut ids: Vec<_> = flow.nodes.iter().map(|n| n.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn explicit_fields_and_actions_are_kept() {
        let partial = FlowGenerationResult {
            flow: SkillFlow {
                name: Some("skills/choice-1.flow.json".into()),
                location: Some("skills/choice-1.flow.json".into()),
                version: Some("2.0".into()),
                start_node: Some("ask".into()),
                nodes: vec![
                    SkillFlowNode {
                        name: "intro".into(),
                        on_enter: Some(vec![Action::say_text("hello")]),
                        ..SkillFlowNode::default()
                    },
                    SkillFlowNode {
                        name: "ask".into(),
                        on_receive: Some(vec![Action::run_with(
                            "builtin/setVariable",
                            json!({"name": "x"}),
                        )]),
                        next: Some(vec![Transition::new("done", "true", "#")]),
                        ..SkillFlowNode::default()
                    },
                ],
                ..SkillFlow::default()
            },
            transitions: vec![Transition::new("done", "true", "")],
            preview: Some("Ask a question".into()),
        };

        let result = finalize_flow(partial).unwrap();
        assert_eq!(result.flow.name, "skills/choice-1.flow.json");
        assert_eq!(result.flow.version, "2.0");
        assert_eq!(result.flow.start_node, "ask");
        assert_eq!(result.flow.nodes[0].on_enter, vec!["say #builtin_text hello"]);
        assert_eq!(
            result.flow.nodes[1].on_receive,
            Some(vec![r#"builtin/setVariable {"name":"x"}"#.to_string()])
        );
        assert_eq!(result.transitions.len(), 1);
        assert_eq!(result.preview.as_deref(), Some("Ask a question"));
    }
}
