// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley dialog core.

use thiserror::Error;

/// The primary error type used across the dialog core.
///
/// Authoring errors (`MalformedCondition`, `EmptySkillFlow`,
/// `UnresolvedTransition`, `InvalidFlow`) are meant to surface when a flow is
/// saved or validated, never mid-conversation. They are never retried.
#[derive(Debug, Error)]
pub enum DialogError {
    /// Configuration errors (invalid values, missing sections).
    #[error("configuration error: {0}")]
    Config(String),

    /// Session store errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A transition guard could not be parsed.
    #[error("malformed condition `{expression}`: {reason}")]
    MalformedCondition { expression: String, reason: String },

    /// A skill generator returned a flow without any node.
    #[error("skill produced a flow with no nodes")]
    EmptySkillFlow,

    /// A transition pointing at an unwired (`""`) target was reached.
    #[error("unresolved transition `{caption}` on node `{node}` of flow `{flow}`")]
    UnresolvedTransition {
        flow: String,
        node: String,
        caption: String,
    },

    /// An instruction string does not follow the instruction grammar.
    #[error("invalid instruction `{instruction}`: {reason}")]
    InvalidInstruction { instruction: String, reason: String },

    /// A middleware handler reported an error, panicked, or dropped its completion handle.
    #[error("middleware `{middleware}` failed: {message}")]
    HandlerFailure { middleware: String, message: String },

    /// A middleware definition was rejected at registration.
    #[error("invalid middleware definition: {0}")]
    InvalidMiddleware(String),

    /// An event failed validation before entering a pipeline.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// A flow definition violates a structural invariant.
    #[error("invalid flow `{flow}`: {message}")]
    InvalidFlow { flow: String, message: String },

    /// No skill is registered under the requested id.
    #[error("skill not found: {0}")]
    SkillNotFound(String),

    /// A skill generator failed (bad parameters, etc.).
    #[error("skill error: {message}")]
    Skill {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DialogError {
    /// Returns true for errors caused by a flow or skill definition rather than runtime state.
    pub fn is_authoring_error(&self) -> bool {
        matches!(
            self,
            DialogError::MalformedCondition { .. }
                | DialogError::EmptySkillFlow
                | DialogError::UnresolvedTransition { .. }
                | DialogError::InvalidFlow { .. }
                | DialogError::InvalidInstruction { .. }
        )
    }
}
