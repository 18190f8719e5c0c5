//! Events emitted while a session is driven through an attempt

use crate::generation::{ImageData, RemoteError, UnitKind};
use crate::session::SessionState;

/// Observable progress of a dream session
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    StateChanged(SessionState),
    TagsLoaded(Vec<String>),
    ImageLoaded { index: usize, image: ImageData },
    ImageFailed { index: usize, error: RemoteError },
    GenerationFailed { kind: UnitKind, error: RemoteError },
}

impl GenerationEvent {
    /// The closing event of an attempt
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationEvent::StateChanged(state) if state.is_terminal())
    }

    /// Unit this event reports on, if it came from one
    pub fn unit(&self) -> Option<UnitKind> {
        match self {
            GenerationEvent::StateChanged(_) => None,
            GenerationEvent::TagsLoaded(_) => Some(UnitKind::Tags),
            GenerationEvent::ImageLoaded { index, .. }
            | GenerationEvent::ImageFailed { index, .. } => Some(UnitKind::Image(*index)),
            GenerationEvent::GenerationFailed { kind, .. } => Some(*kind),
        }
    }
}
