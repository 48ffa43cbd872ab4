// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow definitions and their authoring toolchain.
//!
//! - [`condition`] parses transition guards.
//! - [`instruction`] maps structured actions to and from instruction strings.
//! - [`compiler`] finalizes partial skill flows into canonical [`Flow`]s.
//! - [`skill`] hosts the skill trait and registry.
//! - [`validation`] and [`transition`] check and walk finished flows.

pub mod compiler;
pub mod condition;
pub mod instruction;
pub mod model;
pub mod skill;
pub mod target;
pub mod transition;
pub mod validation;

pub use compiler::{
    FinalizedFlow, FlowGenerationResult, SkillFlow, SkillFlowNode, finalize_flow,
    finalize_flow_with_rng,
};
pub use condition::{Condition, Operation, is_unconditional, parse_condition};
pub use instruction::{Action, ElementArgs, parse_instruction, serialize_action};
pub use model::{Flow, FlowNode, Transition};
pub use skill::{ChoiceSkill, Skill, SkillMetadata, SkillRegistry};
pub use target::TransitionTarget;
pub use transition::{ConditionEvaluator, SelectedTransition, select_transition};
pub use validation::validate_flow;
