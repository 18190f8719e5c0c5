//! Session states and the transitions between them

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::SessionError;

/// Where a dream session currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Editing,
    ReadyToSubmit,
    Analyzing,
    Result,
    Error,
}

/// Inputs that move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    BeginEditing,
    FinishEditing { prompt_empty: bool },
    Submit,
    Complete { failed: bool },
    Reset,
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::BeginEditing => "begin_editing",
            Trigger::FinishEditing { .. } => "finish_editing",
            Trigger::Submit => "submit",
            Trigger::Complete { .. } => "complete",
            Trigger::Reset => "reset",
        }
    }
}

impl SessionState {
    /// Apply a trigger, returning the next state or `InvalidState` when the
    /// pair has no transition.
    pub fn transition(self, trigger: Trigger) -> Result<SessionState, SessionError> {
        use SessionState::*;

        let next = match (self, trigger) {
            (Idle | ReadyToSubmit, Trigger::BeginEditing) => Editing,
            (Editing, Trigger::FinishEditing { prompt_empty: true }) => Idle,
            (Editing, Trigger::FinishEditing { prompt_empty: false }) => ReadyToSubmit,
            (Editing | ReadyToSubmit, Trigger::Submit) => Analyzing,
            (Analyzing, Trigger::Complete { failed: false }) => Result,
            (Analyzing, Trigger::Complete { failed: true }) => Error,
            (Result | Error, Trigger::Reset) => Idle,
            (state, trigger) => {
                return Err(SessionError::InvalidState {
                    state,
                    operation: trigger.name(),
                });
            }
        };

        Ok(next)
    }

    pub fn can_submit(&self) -> bool {
        matches!(self, SessionState::Editing | SessionState::ReadyToSubmit)
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self, SessionState::Analyzing)
    }

    /// `result` and `error` hold until the user discards or acknowledges them
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Result | SessionState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Editing => "editing",
            SessionState::ReadyToSubmit => "ready_to_submit",
            SessionState::Analyzing => "analyzing",
            SessionState::Result => "result",
            SessionState::Error => "error",
        }
    }

    /// Label for the primary edit action in this state
    pub fn edit_action_label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Record your dream",
            SessionState::ReadyToSubmit => "Edit dream",
            SessionState::Analyzing => "Analyzing dream",
            _ => "",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
