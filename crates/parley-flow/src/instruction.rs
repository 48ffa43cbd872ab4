// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured node actions and their instruction-string form.
//!
//! ```text
//! RunAction, no args    := "<actionName>"
//! RunAction, with args  := "<actionName> <jsonArgs>"
//! RenderText            := "say #builtin_text <contentName>"
//! RenderElement, object := "say <contentName> <jsonArgs>"
//! RenderElement, text   := "say <contentName> <args>"
//! ```

use std::fmt;

use parley_core::DialogError;
use serde_json::{Map, Value};

const SAY: &str = "say";
const BUILTIN_TEXT: &str = "#builtin_text";

/// Arguments of a rendered content element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementArgs {
    Object(Map<String, Value>),
    Text(String),
}

/// An action run on node entry or on input.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Invokes a named action, optionally with JSON arguments.
    RunAction { name: String, args: Option<Value> },
    /// Renders a built-in text content item.
    RenderText { name: String },
    /// Renders a content element with arguments.
    RenderElement { name: String, args: ElementArgs },
}

impl Action {
    pub fn run(name: impl Into<String>) -> Self {
        Action::RunAction {
            name: name.into(),
            args: None,
        }
    }

    pub fn run_with(name: impl Into<String>, args: Value) -> Self {
        Action::RunAction {
            name: name.into(),
            args: Some(args),
        }
    }

    pub fn say_text(name: impl Into<String>) -> Self {
        Action::RenderText { name: name.into() }
    }

    pub fn render(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Action::RenderElement {
            name: name.into(),
            args: ElementArgs::Object(args),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_action(self))
    }
}

/// Serializes an action into its instruction string.
pub fn serialize_action(action: &Action) -> String {
    match action {
        Action::RunAction { name, args: None } => name.clone(),
        Action::RunAction {
            name,
            args: Some(args),
        } => format!("{name} {args}"),
        Action::RenderText { name } => format!("{SAY} {BUILTIN_TEXT} {name}"),
        Action::RenderElement {
            name,
            args: ElementArgs::Object(args),
        } => format!("{SAY} {name} {}", Value::Object(args.clone())),
        Action::RenderElement {
            name,
            args: ElementArgs::Text(text),
        } if text.is_empty() => format!("{SAY} {name}"),
        Action::RenderElement {
            name,
            args: ElementArgs::Text(text),
        } => format!("{SAY} {name} {text}"),
    }
}

/// Serializes an optional action list. `None` stays `None`.
pub fn serialize_actions(actions: Option<&[Action]>) -> Option<Vec<String>> {
    actions.map(|list| list.iter().map(serialize_action).collect())
}

/// Reads an instruction string back into an [`Action`].
///
/// Element arguments that parse as a JSON object are read as
/// [`ElementArgs::Object`]; anything else is kept as text.
///
/// The string form does not record which [`ElementArgs`] variant produced it,
/// so text that is itself a JSON object reads back as an object, and text
/// with leading or trailing whitespace reads back trimmed.
pub fn parse_instruction(instruction: &str) -> Result<Action, DialogError> {
    let invalid = |reason: &str| DialogError::InvalidInstruction {
        instruction: instruction.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = instruction.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty instruction"));
    }

    if let Some(rest) = trimmed.strip_prefix("say ") {
        let rest = rest.trim_start();
        let (content, args) = rest.split_once(' ').unwrap_or((rest, ""));
        let args = args.trim();

        if content == BUILTIN_TEXT {
            if args.is_empty() {
                return Err(invalid("missing content name after #builtin_text"));
            }
            return Ok(Action::RenderText {
                name: args.to_string(),
            });
        }

        let args = match serde_json::from_str::<Value>(args) {
            Ok(Value::Object(map)) => ElementArgs::Object(map),
            _ => ElementArgs::Text(args.to_string()),
        };
        return Ok(Action::RenderElement {
            name: content.to_string(),
            args,
        });
    }

    match trimmed.split_once(' ') {
        None => Ok(Action::run(trimmed)),
        Some((name, args)) => serde_json::from_str(args)
            .map(|args| Action::run_with(name, args))
            .map_err(|e| invalid(&format!("action arguments are not JSON: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn serializes_every_action_kind() {
        assert_eq!(serialize_action(&Action::run("analytics/track")), "analytics/track");
        assert_eq!(
            serialize_action(&Action::run_with("builtin/setVariable", json!({"name": "x"}))),
            r#"builtin/setVariable {"name":"x"}"#
        );
        assert_eq!(
            serialize_action(&Action::say_text("welcome")),
            "say #builtin_text welcome"
        );
        assert_eq!(
            serialize_action(&Action::render("builtin_card", object(json!({"title": "Hi"})))),
            r#"say builtin_card {"title":"Hi"}"#
        );
        assert_eq!(
            serialize_action(&Action::RenderElement {
                name: "builtin_image".into(),
                args: ElementArgs::Text("cat.png".into()),
            }),
            "say builtin_image cat.png"
        );
    }

    #[test]
    fn absent_action_lists_stay_absent() {
        assert_eq!(serialize_actions(None), None);
        assert_eq!(serialize_actions(Some(&[][..])), Some(vec![]));
    }

    #[test]
    fn reads_back_all_three_kinds() {
        let actions = [
            Action::run("noop"),
            Action::run_with("builtin/setVariable", json!({"type": "temp", "value": "a b"})),
            Action::say_text("text-greeting"),
            Action::render(
                "builtin_single-choice",
                object(json!({"text": "Pick", "choices": [{"title": "A"}]})),
            ),
            Action::RenderElement {
                name: "builtin_image".into(),
                args: ElementArgs::Text("https://x/y.png".into()),
            },
            Action::RenderElement {
                name: "builtin_typing".into(),
                args: ElementArgs::Text(String::new()),
            },
        ];

        for action in actions {
            let line = serialize_action(&action);
            assert_eq!(parse_instruction(&line).unwrap(), action, "{line}");
        }
    }

    #[test]
    fn element_text_is_not_preserved_verbatim() {
        let json_text = Action::RenderElement {
            name: "builtin_code".into(),
            args: ElementArgs::Text(r#"{"lang":"rust"}"#.into()),
        };
        assert_eq!(
            parse_instruction(&serialize_action(&json_text)).unwrap(),
            Action::render("builtin_code", object(json!({"lang": "rust"})))
        );

        let padded = Action::RenderElement {
            name: "builtin_image".into(),
            args: ElementArgs::Text("  cat.png ".into()),
        };
        assert_eq!(
            parse_instruction(&serialize_action(&padded)).unwrap(),
            Action::RenderElement {
                name: "builtin_image".into(),
                args: ElementArgs::Text("cat.png".into()),
            }
        );
    }

    #[test]
    fn rejects_bad_instructions() {
        assert!(parse_instruction("   ").is_err());
        assert!(parse_instruction("say #builtin_text").is_err());
        assert!(matches!(
            parse_instruction("doThing {not json"),
            Err(DialogError::InvalidInstruction { .. })
        ));
    }
}
