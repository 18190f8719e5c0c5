//! Core types for the generation domain

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Number of image units launched per attempt
pub const IMAGE_SLOT_COUNT: usize = 4;

/// One of the concurrent units of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Tags,
    Image(usize),
}

impl UnitKind {
    /// All units launched by one attempt, tags first
    pub fn all() -> Vec<UnitKind> {
        std::iter::once(UnitKind::Tags)
            .chain((0..IMAGE_SLOT_COUNT).map(UnitKind::Image))
            .collect()
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Tags => write!(f, "tags"),
            UnitKind::Image(index) => write!(f, "image[{}]", index),
        }
    }
}

/// Decides the terminal state of an attempt once every unit has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Tags are required: a failed tags unit ends the attempt in `error`.
    /// Image failures never do.
    #[default]
    TagsRequired,
    /// Every attempt ends in `result`; tags stay empty if their unit failed.
    PartialSuccess,
}

impl CompletionPolicy {
    /// Whether the attempt counts as failed under this policy
    pub fn attempt_failed(&self, tags_failed: bool) -> bool {
        match self {
            CompletionPolicy::TagsRequired => tags_failed,
            CompletionPolicy::PartialSuccess => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionPolicy::TagsRequired => "tags_required",
            CompletionPolicy::PartialSuccess => "partial_success",
        }
    }
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "tags_required" | "strict" => Ok(CompletionPolicy::TagsRequired),
            "partial_success" | "partial" => Ok(CompletionPolicy::PartialSuccess),
            other => Err(format!("Unknown completion policy: {}", other)),
        }
    }
}

/// Encoded image formats a generated image may arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Identify the format from the leading magic bytes
    pub fn detect(bytes: &[u8]) -> Option<ImageFormat> {
        match bytes {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageFormat::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ImageFormat::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
                Some(ImageFormat::Webp)
            }
            _ => None,
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Opaque image bytes, shared cheaply between the session and every subscriber
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData(Arc<Vec<u8>>);

impl ImageData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Format sniffed from the payload, if recognised
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::detect(&self.0)
    }
}

impl From<Vec<u8>> for ImageData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

// Image payloads are large; keep Debug output to a summary
impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("len", &self.len())
            .field("format", &self.format())
            .finish()
    }
}
