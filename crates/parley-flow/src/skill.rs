// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Skill trait and registry.
//!
//! A [`Skill`] is a pure generator from parameters to a partial flow. The
//! [`SkillRegistry`] looks skills up by id and runs their output through
//! [`finalize_flow`](crate::compiler::finalize_flow).

use std::collections::HashMap;
use std::sync::Arc;

use parley_core::DialogError;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::compiler::{
    FinalizedFlow, FlowGenerationResult, SkillFlow, SkillFlowNode, finalize_flow,
};
use crate::instruction::Action;
use crate::model::Transition;

/// Context handed to a skill alongside its parameters.
#[derive(Debug, Clone, Default)]
pub struct SkillMetadata {
    pub bot_id: Option<String>,
    /// Flow the generated skill will be embedded into.
    pub parent_flow: Option<String>,
}

/// A reusable, parameterized flow generator.
pub trait Skill: Send + Sync {
    /// Unique id used for registry lookup.
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Produces a partial flow plus outlets for the embedding flow.
    fn generate_flow(
        &self,
        params: &Value,
        metadata: &SkillMetadata,
    ) -> Result<FlowGenerationResult, DialogError>;
}

/// Registry of available skills, indexed by id.
pub struct SkillRegistry {
    skills: HashMap<String, Arc<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self {
            skills: HashMap::new(),
        }
    }

    /// A registry holding the built-in skills.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.skills.insert(CHOICE_SKILL_ID.to_string(), Arc::new(ChoiceSkill));
        registry
    }

    /// Registers a skill. Ids must be unique.
    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Result<(), DialogError> {
        let id = skill.id().to_string();
        if self.skills.contains_key(&id) {
            return Err(DialogError::Skill {
                message: format!("skill `{id}` is already registered"),
                source: None,
            });
        }
        self.skills.insert(id, skill);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(id).cloned()
    }

    /// (id, description) pairs sorted by id.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .skills
            .values()
            .map(|s| (s.id(), s.description()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Generates and finalizes a skill's flow.
    pub fn compile(
        &self,
        id: &str,
        params: &Value,
        metadata: &SkillMetadata,
    ) -> Result<FinalizedFlow, DialogError> {
        let skill = self
            .get(id)
            .ok_or_else(|| DialogError::SkillNotFound(id.to_string()))?;
        let generated = skill.generate_flow(params, metadata)?;
        let finalized = finalize_flow(generated)?;
        info!(
            skill = id,
            flow = %finalized.flow.name,
            outlets = finalized.transitions.len(),
            "compiled skill"
        );
        Ok(finalized)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub const CHOICE_SKILL_ID: &str = "choice";

/// Variable the choice skill stores the user's answer in.
const DEFAULT_CHOICE_VARIABLE: &str = "choice";

/// Asks a question, waits for an answer and branches on it.
///
/// Parameters: `{"question": "...", "choices": ["a", {"title": "B", "value": "b"}], "variable": "x"}`.
pub struct ChoiceSkill;

#[derive(Debug, Deserialize)]
struct ChoiceParams {
    question: String,
    choices: Vec<ChoiceOption>,
    #[serde(default)]
    variable: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChoiceOption {
    Plain(String),
    Titled { title: String, value: Option<String> },
}

impl ChoiceOption {
    fn title(&self) -> &str {
        match self {
            ChoiceOption::Plain(s) => s,
            ChoiceOption::Titled { title, .. } => title,
        }
    }

    fn value(&self) -> &str {
        match self {
            ChoiceOption::Plain(s) => s,
            ChoiceOption::Titled { title, value } => value.as_deref().unwrap_or(title),
        }
    }
}

impl Skill for ChoiceSkill {
    fn id(&self) -> &str {
        CHOICE_SKILL_ID
    }

    fn description(&self) -> &str {
        "Ask a multiple-choice question and branch on the answer"
    }

    fn generate_flow(
        &self,
        params: &Value,
        _metadata: &SkillMetadata,
    ) -> Result<FlowGenerationResult, DialogError> {
        let params: ChoiceParams =
            serde_json::from_value(params.clone()).map_err(|e| DialogError::Skill {
                message: format!("invalid choice parameters: {e}"),
                source: Some(Box::new(e)),
            })?;
        if params.choices.is_empty() {
            return Err(DialogError::Skill {
                message: "choice skill needs at least one choice".into(),
                source: None,
            });
        }
        let variable = params
            .variable
            .unwrap_or_else(|| DEFAULT_CHOICE_VARIABLE.to_string());

        let mut element = Map::new();
        element.insert("text".into(), Value::String(params.question.clone()));
        element.insert(
            "choices".into(),
            Value::Array(
                params
                    .choices
                    .iter()
                    .map(|c| json!({"title": c.title(), "value": c.value()}))
                    .collect(),
            ),
        );

        let outlets: Vec<Transition> = params
            .choices
            .iter()
            .map(|c| {
                Transition::new(
                    format!("User picked {}", c.title()),
                    format!("${variable}.isEqual('{}')", escape_literal(c.value())),
                    "",
                )
            })
            .chain(std::iter::once(Transition::new("Other", "true", "")))
            .collect();

        let entry = SkillFlowNode {
            name: "entry".into(),
            on_enter: Some(vec![Action::render("builtin_single-choice", element)]),
            on_receive: Some(vec![Action::run_with(
                "builtin/setVariable",
                json!({"type": "temp", "name": variable, "value": "{{event.payload.text}}"}),
            )]),
            next: Some(vec![Transition::new("Answered", "true", "#")]),
        };

        Ok(FlowGenerationResult {
            flow: SkillFlow {
                nodes: vec![entry],
                ..SkillFlow::default()
            },
            transitions: outlets,
            preview: Some(params.question),
        })
    }
}

/// Escapes single quotes for a quoted condition literal.
fn escape_literal(value: &str) -> String {
    value.replace('\'', "\\'")
}
