use serde::{Deserialize, Serialize};

/// How the backend should execute a prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Single tool-using agent.
    #[default]
    Agent,
    /// Planner plus step executor.
    Crew,
}

impl ExecutionMode {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "agent" => Self::Agent,
            "crew" => Self::Crew,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Crew => "crew",
        }
    }
}

/// Request body for one streamed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub backend: String,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub enabled_tools: Vec<String>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            backend: backend.into(),
            mode: ExecutionMode::Agent,
            model_name: None,
            api_key: None,
            enabled_tools: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Blank model names are treated as unset.
    pub fn with_model_name(mut self, model_name: Option<String>) -> Self {
        self.model_name = non_blank(model_name);
        self
    }

    /// Blank keys are treated as unset.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = non_blank(api_key);
        self
    }

    pub fn with_enabled_tools(mut self, tools: impl IntoIterator<Item = String>) -> Self {
        self.enabled_tools = tools.into_iter().collect();
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
