use serde_json::Value;
use thiserror::Error;

/// Step identifier assigned by the backend. Numeric ids are kept in their
/// decimal text form so `1` and `"1"` address the same step.
pub type StepId = String;

/// One decoded backend event.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    TaskStart {
        id: StepId,
        tool: Option<String>,
        input: Option<Value>,
        thought: Option<String>,
    },
    TaskEnd {
        id: StepId,
        output: Option<Value>,
    },
    TaskError {
        id: StepId,
        error: Option<String>,
    },
    FinalAnswer {
        reply: String,
    },
    /// Backend-reported failure of the agent itself. Logged, never folded.
    ServerError {
        message: Option<String>,
    },
    /// Event name this client does not act on.
    Unknown {
        event: String,
    },
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no string 'event' field")]
    MissingEventName,

    #[error("'{event}' payload has no usable 'data.id'")]
    MissingStepId { event: String },
}

const FINAL_ANSWER: &str = "final_answer";
const SERVER_ERROR: &str = "error";
const TASK_START_SUFFIX: &str = "task_start";
const TASK_END_SUFFIX: &str = "task_end";
const TASK_ERROR_SUFFIX: &str = "task_error";

impl AgentEvent {
    /// Parse one record payload of the shape `{"event": "...", "data": {...}}`.
    ///
    /// Step events are matched by suffix so namespaced names such as
    /// `agent.task_start` or `crew_task_end` are accepted.
    pub fn from_payload(payload: &str) -> Result<Self, EventParseError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, EventParseError> {
        let event = value
            .get("event")
            .and_then(Value::as_str)
            .ok_or(EventParseError::MissingEventName)?;
        let data = value.get("data").unwrap_or(&Value::Null);

        if event == FINAL_ANSWER {
            return Ok(Self::FinalAnswer {
                reply: data
                    .get("reply")
                    .map(text_of)
                    .unwrap_or_default(),
            });
        }
        if event == SERVER_ERROR {
            return Ok(Self::ServerError {
                message: data.get("message").map(text_of),
            });
        }

        if event.ends_with(TASK_START_SUFFIX) {
            return Ok(Self::TaskStart {
                id: step_id(event, data)?,
                tool: data.get("tool").and_then(Value::as_str).map(ToOwned::to_owned),
                input: present(data.get("input")),
                thought: present(data.get("thought")).as_ref().map(text_of),
            });
        }
        if event.ends_with(TASK_END_SUFFIX) {
            return Ok(Self::TaskEnd {
                id: step_id(event, data)?,
                output: present(data.get("output")),
            });
        }
        if event.ends_with(TASK_ERROR_SUFFIX) {
            return Ok(Self::TaskError {
                id: step_id(event, data)?,
                error: present(data.get("error")).as_ref().map(text_of),
            });
        }

        Ok(Self::Unknown {
            event: event.to_owned(),
        })
    }
}

fn step_id(event: &str, data: &Value) -> Result<StepId, EventParseError> {
    let missing = || EventParseError::MissingStepId {
        event: event.to_owned(),
    };
    match data.get("id").ok_or_else(missing)? {
        Value::String(id) if !id.trim().is_empty() => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        _ => Err(missing()),
    }
}

fn present(value: Option<&Value>) -> Option<Value> {
    value.filter(|value| !value.is_null()).cloned()
}

/// Strings pass through; anything else keeps its JSON text.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
