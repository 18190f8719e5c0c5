//! Port interfaces for the generation domain

use crate::generation::{ImageData, RemoteError};
use async_trait::async_trait;

/// Talks to the remote tag and image generation services
///
/// Each call is a single request/response. Implementations must not retry on
/// the orchestrator's behalf beyond what their transport does.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate descriptive tags for a dream, in service order, without empty entries
    async fn generate_tags(&self, prompt: &str) -> Result<Vec<String>, RemoteError>;

    /// Generate one complete image for a dream
    ///
    /// `slot` identifies the requesting image position for diagnostics only.
    async fn generate_image(&self, prompt: &str, slot: usize) -> Result<ImageData, RemoteError>;
}
