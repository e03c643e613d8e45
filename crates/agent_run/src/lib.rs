//! Accumulated state of one agent invocation, built from backend events.
//!
//! This crate defines the typed event model decoded from stream payloads and
//! the [`AgentRun`] fold that turns those events into ordered tool steps, a
//! final reply and the set of referenced source URLs. It has no transport or
//! storage dependencies.

pub mod events;
pub mod run;
pub mod sources;

pub use events::{AgentEvent, EventParseError, StepId};
pub use run::{AgentRun, AgentStep, ApplyOutcome, StepStatus};
pub use sources::extract_sources;
