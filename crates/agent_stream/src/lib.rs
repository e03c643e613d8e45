//! Transport-only client for the agent-chat streaming endpoint.
//!
//! This crate owns request building, response status handling and the
//! incremental SSE record decoder. It knows nothing about what the records
//! mean: decoded payloads are handed to the caller as raw strings so the
//! event model can live with the run accumulator.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod tools;
pub mod url;

pub use client::{AgentChatClient, CancelSignal};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use payload::{ChatRequest, ExecutionMode};
pub use sse::SseDecoder;
pub use tools::{all_tool_ids, is_known_tool, TOOL_CATALOG};
pub use url::{normalize_chat_url, DEFAULT_BASE_URL};
