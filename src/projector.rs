//! Bridge between an in-flight [`AgentRun`] and the conversation store.
//!
//! The projector is the only writer to a conversation while a turn is open.
//! Every method takes the store lock for the duration of one synchronous
//! mutation and never across an await point.

use std::sync::{Arc, Mutex, MutexGuard};

use agent_run::AgentRun;
use agent_stream::ChatApiError;
use conversation_store::{new_id, ConversationMessage, ConversationStore, ConversationStoreError};

/// Store handle shared by the session and every turn it drives.
pub type SharedStore = Arc<Mutex<ConversationStore>>;

/// Characters of the first prompt used as the conversation title.
pub const TITLE_PREFIX_CHARS: usize = 30;

const ERROR_CONTENT_PREFIX: &str = "**Error:** ";

/// Identifies the message pair one turn appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnHandle {
    pub conversation_id: String,
    pub user_message_id: String,
    pub assistant_message_id: String,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct ConversationProjector {
    store: SharedStore,
}

impl ConversationProjector {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Append the user prompt and an empty assistant message to open a turn.
    pub fn start_turn(
        &self,
        conversation_id: &str,
        prompt: &str,
    ) -> Result<TurnHandle, ConversationStoreError> {
        let handle = TurnHandle {
            conversation_id: conversation_id.to_string(),
            user_message_id: new_id("msg"),
            assistant_message_id: new_id("asst"),
            prompt: prompt.to_string(),
        };

        let mut store = lock_unpoisoned(&self.store);
        store.append_messages(
            conversation_id,
            [
                ConversationMessage::user(&handle.user_message_id, prompt),
                ConversationMessage::assistant(&handle.assistant_message_id),
            ],
        )?;
        persist(&store);

        tracing::debug!(
            conversation = conversation_id,
            assistant = %handle.assistant_message_id,
            "turn opened"
        );
        Ok(handle)
    }

    /// Overwrite the open assistant message with the run's current state.
    ///
    /// Returns false when the conversation (or message) is gone; nothing is
    /// recreated in that case.
    pub fn apply_snapshot(
        &self,
        conversation_id: &str,
        assistant_message_id: &str,
        run: &AgentRun,
    ) -> bool {
        let mut store = lock_unpoisoned(&self.store);
        let applied = store.update_message(conversation_id, assistant_message_id, |message| {
            message.apply_run(run)
        });

        if applied {
            persist(&store);
        } else {
            tracing::debug!(
                conversation = conversation_id,
                assistant = assistant_message_id,
                "snapshot target no longer exists"
            );
        }
        applied
    }

    /// Name a still-untitled conversation after the prompt that completed.
    pub fn finalize_success(&self, conversation_id: &str, prompt: &str) -> bool {
        let title: String = prompt.chars().take(TITLE_PREFIX_CHARS).collect();
        let mut store = lock_unpoisoned(&self.store);
        let renamed = store.set_title_if_default(conversation_id, &title);
        if renamed {
            persist(&store);
        }
        renamed
    }

    /// Replace the open assistant message with visible error content.
    ///
    /// Cancellation is not a failure: the partial content stays as streamed.
    pub fn finalize_error(&self, handle: &TurnHandle, error: &ChatApiError) -> bool {
        if error.is_cancelled() {
            return false;
        }

        let content = format!("{ERROR_CONTENT_PREFIX}{error}");
        let mut store = lock_unpoisoned(&self.store);
        let replaced = store.update_message(
            &handle.conversation_id,
            &handle.assistant_message_id,
            |message| {
                *message = ConversationMessage {
                    content,
                    ..ConversationMessage::assistant(message.id.clone())
                };
            },
        );
        if replaced {
            persist(&store);
        }
        replaced
    }

    /// Remove both messages of a turn, e.g. after the caller aborted and
    /// does not want to keep the partial exchange.
    pub fn discard_turn(&self, handle: &TurnHandle) -> usize {
        let mut store = lock_unpoisoned(&self.store);
        let removed = store.remove_messages(
            &handle.conversation_id,
            &[&handle.user_message_id, &handle.assistant_message_id],
        );
        if removed > 0 {
            persist(&store);
        }
        removed
    }
}

fn persist(store: &ConversationStore) {
    if let Err(error) = store.save() {
        tracing::warn!(%error, "failed to persist chat state");
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
