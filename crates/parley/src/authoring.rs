// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley validate`, `parley skills` and `parley compile-skill`.

use std::path::Path;

use parley_core::DialogError;
use parley_flow::{Flow, SkillMetadata, SkillRegistry, validate_flow};
use serde_json::{Value, json};

/// Loads a flow file and returns every authoring problem found in it.
///
/// An unreadable or unparsable file is an error; a flow that parses but has
/// problems yields `Ok` with a non-empty list.
pub fn validate_file(path: &Path) -> Result<Vec<DialogError>, DialogError> {
    let unreadable = |message: String| DialogError::InvalidFlow {
        flow: path.display().to_string(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let flow: Flow = serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;
    Ok(validate_flow(&flow).err().unwrap_or_default())
}

/// `(id, description)` of every built-in skill, one per line.
pub fn list_skills(registry: &SkillRegistry) -> String {
    registry
        .list()
        .into_iter()
        .map(|(id, description)| format!("{id}\t{description}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compiles a skill and renders the finalized flow, outlets and preview as JSON.
pub fn compile_skill(
    registry: &SkillRegistry,
    id: &str,
    params: &str,
    parent_flow: Option<String>,
) -> Result<Value, DialogError> {
    let params: Value = serde_json::from_str(params).map_err(|e| DialogError::Skill {
        message: format!("--params is not valid JSON: {e}"),
        source: Some(Box::new(e)),
    })?;
    let metadata = SkillMetadata {
        bot_id: None,
        parent_flow,
    };
    let compiled = registry.compile(id, &params, &metadata)?;
    Ok(json!({
        "flow": compiled.flow,
        "transitions": compiled.transitions,
        "preview": compiled.preview,
    }))
}
