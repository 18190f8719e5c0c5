//! Error types for the generation domain

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single remote call failed
///
/// `status` is the HTTP status when the service answered, `None` when the
/// request never got a response (connect failure, timeout, undecodable body).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    /// Create a new remote error
    pub fn new<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Error for a call that got an HTTP response with the given status
    pub fn http<S: Into<String>>(status: u16, message: S) -> Self {
        Self::new(Some(status), message)
    }

    /// Error for a call that never produced a response
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::new(None, message)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "Remote error (HTTP {}): {}", status, self.message),
            None => write!(f, "Remote error: {}", self.message),
        }
    }
}
