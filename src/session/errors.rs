//! Session error types

use thiserror::Error;

use crate::session::SessionState;

/// Errors raised synchronously by session operations
///
/// These reject an operation without touching the session; they are never
/// the outcome of a generation attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        state: SessionState,
        operation: &'static str,
    },

    #[error("Dream prompt cannot be empty")]
    EmptyPrompt,
}
