//! Data Transfer Objects for application layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::generation::{ImageFormat, RemoteError};
use crate::session::{ErrorRecord, ImageSlot, Session, SessionState, SlotStatus};

/// Request to turn a dream description into tags and images
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateDreamRequest {
    pub prompt: String,
    /// Where to write images and `dream.json`; nothing is written when absent
    pub output_dir: Option<PathBuf>,
}

impl GenerateDreamRequest {
    pub fn validate(&self) -> Result<(), crate::application::ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(crate::application::ValidationError::EmptyPrompt);
        }

        if let Some(dir) = &self.output_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(crate::application::ValidationError::InvalidOutputDir(
                    dir.display().to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// A file produced from a finished attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DreamArtifact {
    pub path: PathBuf,
    pub content: Vec<u8>,
}

/// Per-slot outcome of an attempt
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub index: usize,
    pub status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ImageReport {
    fn from_slot(index: usize, slot: &ImageSlot) -> Self {
        let (format, bytes, error) = match slot {
            ImageSlot::Loaded(image) => (image.format(), Some(image.len()), None),
            ImageSlot::Failed(error) => (None, None, Some(error.clone())),
            ImageSlot::Empty => (None, None, None),
        };
        Self {
            index,
            status: slot.status(),
            format,
            bytes,
            error,
            path: None,
        }
    }
}

/// Summary written next to the images as `dream.json`
#[derive(Debug, Clone, Serialize)]
pub struct DreamRecord {
    pub session_id: Uuid,
    pub attempt: u32,
    pub prompt: String,
    pub state: SessionState,
    pub tags: Vec<String>,
    pub images: Vec<SlotStatus>,
    pub recorded_at: DateTime<Utc>,
}

impl From<&Session> for DreamRecord {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            attempt: session.attempt,
            prompt: session.prompt.clone(),
            state: session.state,
            tags: session.tags().to_vec(),
            images: session.slot_statuses(),
            recorded_at: Utc::now(),
        }
    }
}

/// Response from dream generation
#[derive(Debug, Clone, Serialize)]
pub struct GenerateDreamResponse {
    pub session_id: Uuid,
    pub attempt: u32,
    pub prompt: String,
    pub state: SessionState,
    pub tags: Vec<String>,
    pub images: Vec<ImageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub artifacts_count: usize,
    pub elapsed_ms: u64,
}

impl GenerateDreamResponse {
    pub fn from_session(session: &Session, elapsed_ms: u64) -> Self {
        Self {
            session_id: session.id,
            attempt: session.attempt,
            prompt: session.prompt.clone(),
            state: session.state,
            tags: session.tags().to_vec(),
            images: session
                .images
                .iter()
                .enumerate()
                .map(|(index, slot)| ImageReport::from_slot(index, slot))
                .collect(),
            last_error: session.last_error.clone(),
            output_path: None,
            artifacts_count: 0,
            elapsed_ms,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == SessionState::Result
    }
}
