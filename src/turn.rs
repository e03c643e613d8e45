use std::sync::atomic::Ordering;

use agent_run::AgentRun;
use agent_stream::{CancelSignal, ChatApiError};

use crate::projector::{ConversationProjector, TurnHandle};

/// Lifecycle of one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Errored(String),
    Aborted,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored(_) | Self::Aborted)
    }
}

/// Per-turn accumulator: owns the run and projects it after every record.
#[derive(Debug)]
pub struct Turn {
    handle: TurnHandle,
    run: AgentRun,
    cancel: CancelSignal,
    state: TurnState,
    skipped_records: usize,
}

/// Final result of a turn handed back to the caller.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub handle: TurnHandle,
    pub state: TurnState,
    pub run: AgentRun,
    /// Records that could not be parsed and were skipped.
    pub skipped_records: usize,
}

impl Turn {
    pub fn new(handle: TurnHandle, cancel: CancelSignal) -> Self {
        Self {
            handle,
            run: AgentRun::new(),
            cancel,
            state: TurnState::Idle,
            skipped_records: 0,
        }
    }

    pub fn handle(&self) -> &TurnHandle {
        &self.handle
    }

    pub fn run(&self) -> &AgentRun {
        &self.run
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn mark_sending(&mut self) {
        if self.state == TurnState::Idle {
            self.state = TurnState::Sending;
        }
    }

    /// Fold one record payload and push the resulting snapshot.
    ///
    /// Returns whether a snapshot reached the store. Once the turn is terminal
    /// or cancelled, payloads are ignored.
    pub fn on_payload(&mut self, projector: &ConversationProjector, payload: &str) -> bool {
        if self.state.is_terminal() || self.is_cancelled() {
            return false;
        }
        self.state = TurnState::Streaming;

        if let Err(error) = self.run.apply_payload(payload) {
            self.skipped_records += 1;
            tracing::warn!(
                %error,
                conversation = %self.handle.conversation_id,
                record = %truncate_for_log(payload),
                "skipping malformed stream record"
            );
            return false;
        }

        projector.apply_snapshot(
            &self.handle.conversation_id,
            &self.handle.assistant_message_id,
            &self.run,
        )
    }

    /// Settle the turn once the stream has ended, failed or been cancelled.
    pub fn finish(
        &mut self,
        projector: &ConversationProjector,
        result: Result<(), ChatApiError>,
    ) -> &TurnState {
        if self.state.is_terminal() {
            return &self.state;
        }

        self.state = match result {
            _ if self.is_cancelled() => TurnState::Aborted,
            Err(error) if error.is_cancelled() => TurnState::Aborted,
            Ok(()) => {
                projector.finalize_success(&self.handle.conversation_id, &self.handle.prompt);
                TurnState::Completed
            }
            Err(error) => {
                tracing::warn!(
                    %error,
                    conversation = %self.handle.conversation_id,
                    "turn failed"
                );
                projector.finalize_error(&self.handle, &error);
                TurnState::Errored(error.to_string())
            }
        };
        &self.state
    }

    pub fn into_outcome(self) -> TurnOutcome {
        TurnOutcome {
            handle: self.handle,
            state: self.state,
            run: self.run,
            skipped_records: self.skipped_records,
        }
    }
}

fn truncate_for_log(payload: &str) -> String {
    const MAX_CHARS: usize = 200;
    if payload.chars().count() <= MAX_CHARS {
        return payload.to_string();
    }
    let mut truncated: String = payload.chars().take(MAX_CHARS).collect();
    truncated.push('…');
    truncated
}
