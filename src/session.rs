use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use agent_stream::{
    all_tool_ids, AgentChatClient, CancelSignal, ChatRequest, ExecutionMode,
};
use conversation_store::ConversationStoreError;
use thiserror::Error;

use crate::projector::{lock_unpoisoned, ConversationProjector, SharedStore};
use crate::turn::{Turn, TurnOutcome};

/// Per-send choices that are not part of the persisted settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOptions {
    pub mode: ExecutionMode,
    pub enabled_tools: Vec<String>,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            enabled_tools: all_tool_ids(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("a turn is already running in conversation '{0}'")]
    TurnAlreadyActive(String),
    #[error(transparent)]
    Store(#[from] ConversationStoreError),
}

/// Drives turns against one backend and one store.
///
/// At most one turn runs per conversation; turns in different conversations
/// are independent and each has its own cancellation signal.
#[derive(Debug)]
pub struct ChatSession {
    client: AgentChatClient,
    projector: ConversationProjector,
    active_turns: Mutex<HashMap<String, CancelSignal>>,
}

impl ChatSession {
    pub fn new(client: AgentChatClient, store: SharedStore) -> Self {
        Self {
            client,
            projector: ConversationProjector::new(store),
            active_turns: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &AgentChatClient {
        &self.client
    }

    pub fn projector(&self) -> &ConversationProjector {
        &self.projector
    }

    pub fn store(&self) -> &SharedStore {
        self.projector.store()
    }

    /// Run one turn to completion: append the message pair, stream the reply
    /// into the assistant message and settle it.
    ///
    /// Transport and server failures do not surface as `Err`; they end the
    /// turn in `TurnState::Errored` with the error written into the
    /// conversation.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        prompt: &str,
        options: TurnOptions,
    ) -> Result<TurnOutcome, SessionError> {
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }

        let cancel = self.register_turn(conversation_id)?;
        let _active = ActiveTurnGuard {
            turns: &self.active_turns,
            conversation_id: conversation_id.to_string(),
        };

        let handle = self.projector.start_turn(conversation_id, prompt)?;
        let request = self.build_request(prompt, options);

        let mut turn = Turn::new(handle, Arc::clone(&cancel));
        turn.mark_sending();
        let result = self
            .client
            .stream_with_handler(&request, Some(&cancel), |payload| {
                turn.on_payload(&self.projector, &payload);
            })
            .await;
        let state = turn.finish(&self.projector, result);
        tracing::debug!(conversation = conversation_id, ?state, "turn settled");

        Ok(turn.into_outcome())
    }

    /// Signal the running turn in `conversation_id` to stop. Returns false
    /// when no turn is running there.
    pub fn cancel(&self, conversation_id: &str) -> bool {
        let turns = lock_unpoisoned(&self.active_turns);
        match turns.get(conversation_id) {
            Some(cancel) => {
                cancel.store(true, Ordering::Release);
                tracing::debug!(conversation = conversation_id, "turn cancellation requested");
                true
            }
            None => false,
        }
    }

    pub fn is_processing(&self, conversation_id: &str) -> bool {
        lock_unpoisoned(&self.active_turns).contains_key(conversation_id)
    }

    fn register_turn(&self, conversation_id: &str) -> Result<CancelSignal, SessionError> {
        let mut turns = lock_unpoisoned(&self.active_turns);
        if turns.contains_key(conversation_id) {
            return Err(SessionError::TurnAlreadyActive(conversation_id.to_string()));
        }
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
        turns.insert(conversation_id.to_string(), Arc::clone(&cancel));
        Ok(cancel)
    }

    fn build_request(&self, prompt: &str, options: TurnOptions) -> ChatRequest {
        let settings = lock_unpoisoned(self.store()).settings().clone();
        let api_key = Some(settings.api_key);
        ChatRequest::new(prompt, settings.backend)
            .with_mode(options.mode)
            .with_model_name(settings.model)
            .with_api_key(api_key)
            .with_enabled_tools(options.enabled_tools)
    }
}

struct ActiveTurnGuard<'a> {
    turns: &'a Mutex<HashMap<String, CancelSignal>>,
    conversation_id: String,
}

impl Drop for ActiveTurnGuard<'_> {
    fn drop(&mut self) {
        lock_unpoisoned(self.turns).remove(&self.conversation_id);
    }
}
