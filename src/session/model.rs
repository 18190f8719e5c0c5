//! The dream session entity

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::generation::{IMAGE_SLOT_COUNT, ImageData, RemoteError, UnitKind};
use crate::session::SessionState;

/// Result held by one image position
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ImageSlot {
    #[default]
    Empty,
    Loaded(ImageData),
    Failed(RemoteError),
}

impl ImageSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, ImageSlot::Empty)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ImageSlot::Loaded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ImageSlot::Failed(_))
    }

    pub fn image(&self) -> Option<&ImageData> {
        match self {
            ImageSlot::Loaded(image) => Some(image),
            _ => None,
        }
    }

    pub fn status(&self) -> SlotStatus {
        match self {
            ImageSlot::Empty => SlotStatus::Empty,
            ImageSlot::Loaded(_) => SlotStatus::Loaded,
            ImageSlot::Failed(_) => SlotStatus::Failed,
        }
    }
}

/// Byte-free view of a slot for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Empty,
    Loaded,
    Failed,
}

/// A failure observed during the current attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub unit: UnitKind,
    pub error: RemoteError,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(unit: UnitKind, error: RemoteError) -> Self {
        Self {
            unit,
            error,
            occurred_at: Utc::now(),
        }
    }
}

/// Prompt, lifecycle state and accumulated results of one dream
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub prompt: String,
    pub state: SessionState,
    pub tags: Option<Vec<String>>,
    pub images: [ImageSlot; IMAGE_SLOT_COUNT],
    pub last_error: Option<ErrorRecord>,
    /// Number of accepted submissions
    pub attempt: u32,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: String::new(),
            state: SessionState::Idle,
            tags: None,
            images: Default::default(),
            last_error: None,
            attempt: 0,
        }
    }

    /// Loaded tags, or an empty slice while absent
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// Clear results ahead of a new attempt and return its number
    pub(crate) fn begin_attempt(&mut self) -> u32 {
        self.tags = None;
        self.images = Default::default();
        self.last_error = None;
        self.attempt += 1;
        self.attempt
    }

    /// Store tags unless this attempt already has them
    pub(crate) fn record_tags(&mut self, tags: Vec<String>) -> bool {
        if self.tags.is_some() {
            return false;
        }
        self.tags = Some(tags);
        true
    }

    /// Settle an empty slot; a settled slot is left untouched
    pub(crate) fn settle_image(&mut self, index: usize, slot: ImageSlot) -> bool {
        match self.images.get_mut(index) {
            Some(current) if current.is_empty() => {
                *current = slot;
                true
            }
            _ => false,
        }
    }

    /// Keep the failure that explains the attempt, whatever order units finish in.
    /// A tags failure outranks any image failure; a lower slot outranks a higher one.
    pub(crate) fn record_failure(&mut self, record: ErrorRecord) {
        let replace = self
            .last_error
            .as_ref()
            .is_none_or(|current| failure_rank(record.unit) < failure_rank(current.unit));
        if replace {
            self.last_error = Some(record);
        }
    }

    /// Back to a blank idle session; the id survives
    pub(crate) fn reset(&mut self) {
        self.prompt.clear();
        self.state = SessionState::Idle;
        self.tags = None;
        self.images = Default::default();
        self.last_error = None;
    }

    /// True once no slot is left empty
    pub fn images_settled(&self) -> bool {
        self.images.iter().all(|slot| !slot.is_empty())
    }

    pub fn loaded_count(&self) -> usize {
        self.images.iter().filter(|slot| slot.is_loaded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.images.iter().filter(|slot| slot.is_failed()).count()
    }

    pub fn slot_statuses(&self) -> Vec<SlotStatus> {
        self.images.iter().map(ImageSlot::status).collect()
    }
}

fn failure_rank(unit: UnitKind) -> usize {
    match unit {
        UnitKind::Tags => 0,
        UnitKind::Image(index) => index + 1,
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
