use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ConversationStoreError;
use crate::schema::{ChatState, Conversation, ConversationMessage, Settings, Theme};

/// Owner of all conversations, settings and theme.
///
/// Mutations go through the narrow methods below. A store created with
/// [`ConversationStore::in_memory`] never touches disk.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    path: Option<PathBuf>,
    state: ChatState,
}

impl ConversationStore {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load state from `path`, falling back to defaults when the file is
    /// missing or unreadable. The path is kept for later [`Self::save`] calls.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(store) => store,
            Err(error) => {
                tracing::warn!(%error, "could not load chat state; starting fresh");
                Self {
                    path: Some(path.to_path_buf()),
                    state: ChatState::default(),
                }
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, ConversationStoreError> {
        let state = match fs::read_to_string(path) {
            Ok(raw) if raw.trim().is_empty() => ChatState::default(),
            Ok(raw) => serde_json::from_str::<ChatState>(&raw)
                .map_err(|source| ConversationStoreError::json(path, source))?,
            Err(error) if error.kind() == ErrorKind::NotFound => ChatState::default(),
            Err(source) => {
                return Err(ConversationStoreError::io("reading chat state", path, source))
            }
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            state,
        })
    }

    /// Persist the whole state. The file is replaced atomically.
    pub fn save(&self) -> Result<(), ConversationStoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                ConversationStoreError::io("creating chat state directory", parent, source)
            })?;
        }

        let serialized = serde_json::to_string_pretty(&self.state)
            .map_err(|source| ConversationStoreError::json_serialize(path, source))?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized)
            .map_err(|source| ConversationStoreError::io("writing chat state", &tmp_path, source))?;
        fs::rename(&tmp_path, path)
            .map_err(|source| ConversationStoreError::io("replacing chat state", path, source))
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.state.theme
    }

    #[must_use]
    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.state.conversations.get(id)
    }

    #[must_use]
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.state
            .current_conversation_id
            .as_deref()
            .and_then(|id| self.conversation(id))
    }

    /// Conversations ordered newest first.
    #[must_use]
    pub fn sorted_conversations(&self) -> Vec<&Conversation> {
        let mut conversations: Vec<_> = self.state.conversations.values().collect();
        conversations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
        conversations
    }

    /// Create an empty conversation, make it current and return its id.
    pub fn new_conversation(&mut self) -> String {
        let id = new_id("convo");
        self.state
            .conversations
            .insert(id.clone(), Conversation::new(id.clone(), now_millis()));
        self.state.current_conversation_id = Some(id.clone());
        id
    }

    pub fn select(&mut self, id: &str) -> Result<(), ConversationStoreError> {
        if !self.state.conversations.contains_key(id) {
            return Err(ConversationStoreError::UnknownConversation { id: id.to_string() });
        }
        self.state.current_conversation_id = Some(id.to_string());
        Ok(())
    }

    /// Returns false when no such conversation existed.
    pub fn delete_conversation(&mut self, id: &str) -> bool {
        let removed = self.state.conversations.remove(id).is_some();
        if self.state.current_conversation_id.as_deref() == Some(id) {
            self.state.current_conversation_id = None;
        }
        removed
    }

    pub fn delete_all(&mut self) {
        self.state.conversations.clear();
        self.state.current_conversation_id = None;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.state.theme = self.state.theme.toggled();
        self.state.theme
    }

    pub fn update_settings(&mut self, settings: Settings) {
        self.state.settings = settings;
    }

    pub fn append_messages(
        &mut self,
        conversation_id: &str,
        messages: impl IntoIterator<Item = ConversationMessage>,
    ) -> Result<(), ConversationStoreError> {
        let conversation = self
            .state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| ConversationStoreError::UnknownConversation {
                id: conversation_id.to_string(),
            })?;
        conversation.messages.extend(messages);
        Ok(())
    }

    /// Mutate one message in place. Returns false, without creating anything,
    /// when the conversation or message no longer exists.
    pub fn update_message(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        update: impl FnOnce(&mut ConversationMessage),
    ) -> bool {
        let Some(conversation) = self.state.conversations.get_mut(conversation_id) else {
            return false;
        };
        // Open turns always write to the tail, so search from the end.
        match conversation
            .messages
            .iter_mut()
            .rev()
            .find(|message| message.id == message_id)
        {
            Some(message) => {
                update(message);
                true
            }
            None => false,
        }
    }

    pub fn set_title_if_default(&mut self, conversation_id: &str, title: &str) -> bool {
        match self.state.conversations.get_mut(conversation_id) {
            Some(conversation) if conversation.has_default_title() => {
                conversation.title = title.to_string();
                true
            }
            _ => false,
        }
    }

    /// Remove the given messages; returns how many were removed.
    pub fn remove_messages(&mut self, conversation_id: &str, message_ids: &[&str]) -> usize {
        let Some(conversation) = self.state.conversations.get_mut(conversation_id) else {
            return 0;
        };
        let before = conversation.messages.len();
        conversation
            .messages
            .retain(|message| !message_ids.contains(&message.id.as_str()));
        before - conversation.messages.len()
    }
}

/// `<prefix>_<uuid>` identifier for conversations and messages.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Current time in Unix epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
