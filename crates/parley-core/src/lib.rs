// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley dialog execution core.
//!
//! This crate provides the foundational types shared by every other crate in
//! the workspace: the conversational [`Event`], the composite [`SessionId`],
//! the persisted [`DialogSession`] record, the [`DialogError`] taxonomy, and
//! the collaborator traits ([`SessionStore`], [`EventSink`], [`Clock`],
//! [`Scheduler`]) that the janitor and the pipeline meet at.

pub mod error;
pub mod event;
pub mod session;
pub mod traits;

pub use error::DialogError;
pub use event::{Direction, Event, EventBuilder, EventDestination, StepScope, StepStatus};
pub use session::{DialogSession, SessionId, FALLBACK_CHANNEL, SUBSTATE_DELIMITER};
pub use traits::{
    Clock, EventSink, ScheduledTask, Scheduler, SessionStore, SystemClock, TickFuture, TimerHandle,
};
