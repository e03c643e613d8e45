//! Streaming chat client for a multi-step agent backend.
//!
//! One turn flows through three layers:
//! - `agent_stream` posts the prompt and decodes the SSE response into raw
//!   record payloads.
//! - `agent_run` folds each payload into an [`AgentRun`]: ordered tool steps,
//!   the final reply and the sources cited along the way.
//! - [`ConversationProjector`] mirrors every run snapshot into the open
//!   assistant message of the persisted conversation.
//!
//! [`ChatSession`] ties them together with per-conversation cancellation.

pub mod config;
pub mod logging;
pub mod projector;
pub mod session;
pub mod turn;

pub use agent_run::{AgentRun, AgentStep, StepStatus};
pub use agent_stream::{AgentChatClient, ChatApiConfig, ChatApiError, ExecutionMode};
pub use conversation_store::ConversationStore;

pub use crate::config::{ConfigError, EnvConfig};
pub use crate::projector::{
    lock_unpoisoned, ConversationProjector, SharedStore, TurnHandle, TITLE_PREFIX_CHARS,
};
pub use crate::session::{ChatSession, SessionError, TurnOptions};
pub use crate::turn::{Turn, TurnOutcome, TurnState};
