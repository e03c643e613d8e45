use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{AgentEvent, EventParseError, StepId};
use crate::sources::extract_sources;

/// Lifecycle of one tool step. `Running` moves to exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Error,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// One tool invocation reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub id: StepId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

impl AgentStep {
    fn running(
        id: StepId,
        tool: Option<String>,
        input: Option<Value>,
        thought: Option<String>,
    ) -> Self {
        Self {
            id,
            tool,
            status: StepStatus::Running,
            input,
            output: None,
            error: None,
            thought,
        }
    }

    /// Step whose terminal event arrived before its start.
    fn synthesized(id: StepId, status: StepStatus) -> Self {
        Self {
            id,
            tool: None,
            status,
            input: None,
            output: None,
            error: None,
            thought: None,
        }
    }
}

/// What a single event did to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    StepStarted,
    /// `task_start` for an id already present; the step was replaced in place.
    StepRestarted,
    StepFinished,
    /// Terminal event for an unseen id; the step was created in its terminal state.
    StepSynthesized,
    /// Terminal event for a step that had already finished; dropped.
    StaleTerminal,
    FinalReply,
    Ignored,
}

/// Accumulated trace of one agent invocation.
///
/// Steps keep discovery order and are indexed by id for constant-time lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentRun {
    steps: Vec<AgentStep>,
    index_by_id: HashMap<StepId, usize>,
    final_reply: String,
    sources: Vec<String>,
}

impl AgentRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&AgentStep> {
        self.index_by_id.get(id).map(|index| &self.steps[*index])
    }

    pub fn final_reply(&self) -> &str {
        &self.final_reply
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.final_reply.is_empty()
    }

    /// Parse one record payload and fold it into the run.
    pub fn apply_payload(&mut self, payload: &str) -> Result<ApplyOutcome, EventParseError> {
        let event = AgentEvent::from_payload(payload)?;
        Ok(self.apply(event))
    }

    /// Fold one event into the run and refresh the derived source list.
    pub fn apply(&mut self, event: AgentEvent) -> ApplyOutcome {
        let outcome = match event {
            AgentEvent::TaskStart {
                id,
                tool,
                input,
                thought,
            } => {
                let step = AgentStep::running(id, tool, input, thought);
                match self.index_by_id.get(&step.id).copied() {
                    Some(index) => {
                        self.steps[index] = step;
                        ApplyOutcome::StepRestarted
                    }
                    None => {
                        self.push_step(step);
                        ApplyOutcome::StepStarted
                    }
                }
            }
            AgentEvent::TaskEnd { id, output } => {
                self.finish_step(id, StepStatus::Completed, |step| step.output = output)
            }
            AgentEvent::TaskError { id, error } => {
                self.finish_step(id, StepStatus::Error, |step| step.error = error)
            }
            AgentEvent::FinalAnswer { reply } => {
                self.final_reply = reply;
                ApplyOutcome::FinalReply
            }
            AgentEvent::ServerError { message } => {
                tracing::warn!(
                    message = message.as_deref().unwrap_or("<none>"),
                    "backend reported an agent error"
                );
                ApplyOutcome::Ignored
            }
            AgentEvent::Unknown { event } => {
                tracing::debug!(%event, "ignoring unknown agent event");
                ApplyOutcome::Ignored
            }
        };

        self.sources = extract_sources(&self.steps);
        outcome
    }

    fn finish_step(
        &mut self,
        id: StepId,
        status: StepStatus,
        attach: impl FnOnce(&mut AgentStep),
    ) -> ApplyOutcome {
        match self.index_by_id.get(&id).copied() {
            Some(index) => {
                let step = &mut self.steps[index];
                if step.status.is_terminal() {
                    tracing::debug!(
                        step = %step.id,
                        current = step.status.as_str(),
                        "dropping terminal event for finished step"
                    );
                    return ApplyOutcome::StaleTerminal;
                }
                step.status = status;
                attach(step);
                ApplyOutcome::StepFinished
            }
            None => {
                let mut step = AgentStep::synthesized(id, status);
                attach(&mut step);
                self.push_step(step);
                ApplyOutcome::StepSynthesized
            }
        }
    }

    fn push_step(&mut self, step: AgentStep) {
        self.index_by_id.insert(step.id.clone(), self.steps.len());
        self.steps.push(step);
    }
}
