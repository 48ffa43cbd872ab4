// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transition guard parser.
//!
//! A guard has the shape `[!]$var.operator(arg, ...)` where each argument is
//! either a single-quoted literal (`\'` escapes a quote) or a `$variable`.
//! The variable of an [`Operation`] is the first `$name` token anywhere in the
//! expression, read left to right. Callers that need the operator's subject
//! must write it first.

use std::sync::LazyLock;

use parley_core::DialogError;
use regex::Regex;

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([a-zA-Z][a-zA-Z0-9_-]*)").expect("valid regex"));

static OPERATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([a-zA-Z0-9_-]+)\(").expect("valid regex"));

/// Guards that always hold.
const UNCONDITIONAL: &[&str] = &["", "true", "yes"];

/// A parsed guard expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub variable: String,
    pub operator: String,
    /// Literal arguments unwrapped of their quotes, variable arguments of their `$`.
    pub args: Vec<String>,
    pub negate: bool,
}

/// A transition guard, either trivially true or an operation to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    Operation(Operation),
}

impl Condition {
    /// Parses a transition's `condition` field.
    pub fn parse(expression: &str) -> Result<Self, DialogError> {
        if is_unconditional(expression) {
            Ok(Condition::Always)
        } else {
            parse_condition(expression).map(Condition::Operation)
        }
    }
}

/// True for empty, `true` and `yes` guards.
pub fn is_unconditional(expression: &str) -> bool {
    UNCONDITIONAL.contains(&expression.trim())
}

/// Parses a guard expression into an [`Operation`].
pub fn parse_condition(expression: &str) -> Result<Operation, DialogError> {
    let malformed = |reason: &str| DialogError::MalformedCondition {
        expression: expression.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = expression.trim();
    let negate = trimmed.starts_with('!');

    let variable = first_variable(trimmed).ok_or_else(|| malformed("no `$variable` found"))?;

    let operator = OPERATOR_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| malformed("no `.operator(` call found"))?;

    let open = trimmed
        .find('(')
        .ok_or_else(|| malformed("missing `(`"))?;
    let close = trimmed
        .rfind(')')
        .filter(|close| *close > open)
        .ok_or_else(|| malformed("missing closing `)`"))?;

    let args = split_args(&trimmed[open + 1..close])
        .into_iter()
        .map(classify_arg)
        .collect();

    Ok(Operation {
        variable,
        operator,
        args,
        negate,
    })
}

fn first_variable(text: &str) -> Option<String> {
    VARIABLE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Splits on commas outside single-quoted strings.
///
/// A quote preceded by a backslash does not open or close a string. Blank
/// spans are dropped, so `()` yields no arguments.
fn split_args(raw: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        match c {
            '\\' => {
                escaped = !escaped;
                continue;
            }
            '\'' if !escaped => in_string = !in_string,
            ',' if !in_string => {
                push_span(&mut spans, &raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        escaped = false;
    }
    push_span(&mut spans, &raw[start..]);
    spans
}

fn push_span<'a>(spans: &mut Vec<&'a str>, span: &'a str) {
    let span = span.trim();
    if !span.is_empty() {
        spans.push(span);
    }
}

fn classify_arg(arg: &str) -> String {
    if arg.len() >= 2 && arg.starts_with('\'') && arg.ends_with('\'') {
        return arg[1..arg.len() - 1].replace("\\'", "'");
    }
    first_variable(arg).unwrap_or_else(|| arg.to_string())
}
