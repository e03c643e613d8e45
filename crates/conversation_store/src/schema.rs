use std::collections::BTreeMap;

use agent_run::{AgentRun, AgentStep};
use serde::{Deserialize, Serialize};

/// Title of a conversation that has not been named from its first prompt yet.
pub const DEFAULT_TITLE: &str = "New Chat";
pub const DEFAULT_BACKEND: &str = "ollama";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// Backend selection and credentials sent with every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub backend: String,
    pub api_key: String,
    pub model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            api_key: String::new(),
            model: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One persisted chat turn half.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<AgentStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl ConversationMessage {
    #[must_use]
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            steps: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Empty assistant message that a turn streams into.
    #[must_use]
    pub fn assistant(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: String::new(),
            steps: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Overwrite content, steps and sources with the run's current state.
    pub fn apply_run(&mut self, run: &AgentRun) {
        self.content = run.final_reply().to_string();
        self.steps = run.steps().to_vec();
        self.sources = run.sources().to_vec();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    /// Creation time in Unix epoch milliseconds.
    pub timestamp: i64,
}

impl Conversation {
    #[must_use]
    pub fn new(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            timestamp,
        }
    }

    #[must_use]
    pub fn message(&self, id: &str) -> Option<&ConversationMessage> {
        self.messages.iter().find(|message| message.id == id)
    }

    #[must_use]
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }
}

/// Whole persisted client state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatState {
    pub theme: Theme,
    pub conversations: BTreeMap<String, Conversation>,
    pub current_conversation_id: Option<String>,
    pub settings: Settings,
}
