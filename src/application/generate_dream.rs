//! Use case for generating tags and images for a dream

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::application::{
    ApplicationError, DreamArtifact, DreamRecord, GenerateDreamRequest, GenerateDreamResponse,
    OutputService,
};
use crate::generation::GenerationOrchestrator;
use crate::session::{Session, SessionState};

pub const RECORD_FILE_NAME: &str = "dream.json";

/// Runs one attempt end to end and optionally writes its results
pub struct GenerateDreamUseCase {
    orchestrator: GenerationOrchestrator,
    output_service: Arc<dyn OutputService>,
}

impl GenerateDreamUseCase {
    pub fn new(
        orchestrator: GenerationOrchestrator,
        output_service: Arc<dyn OutputService>,
    ) -> Self {
        Self {
            orchestrator,
            output_service,
        }
    }

    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    pub async fn execute(
        &self,
        request: GenerateDreamRequest,
    ) -> Result<GenerateDreamResponse, ApplicationError> {
        // 1. Validate request
        request.validate()?;
        let started = Instant::now();

        // 2. Bring the session to a state that accepts a submission
        self.prepare_session()?;

        // 3. Run the attempt to its join barrier
        let handle = self.orchestrator.submit(request.prompt.clone())?;
        let state = handle.wait().await;
        let session = self.orchestrator.session();

        let mut response =
            GenerateDreamResponse::from_session(&session, started.elapsed().as_millis() as u64);

        // 4. Write artifacts when an output directory was requested
        if let Some(output_dir) = &request.output_dir {
            self.output_service.ensure_directory(output_dir).await?;

            let artifacts = dream_artifacts(&session, output_dir)?;
            self.output_service.write_artifacts(&artifacts).await?;

            for report in &mut response.images {
                report.path = session.images[report.index]
                    .is_loaded()
                    .then(|| image_path(&session, output_dir, report.index));
            }
            response.artifacts_count = artifacts.len();
            response.output_path = Some(output_dir.clone());
        }

        info!(
            state = %state,
            artifacts = response.artifacts_count,
            "Dream generation finished"
        );
        Ok(response)
    }

    fn prepare_session(&self) -> Result<(), ApplicationError> {
        match self.orchestrator.state() {
            SessionState::Result => self.orchestrator.discard_result()?,
            SessionState::Error => self.orchestrator.acknowledge_error()?,
            _ => {}
        }
        if self.orchestrator.state() == SessionState::Idle {
            self.orchestrator.begin_editing()?;
        }
        Ok(())
    }
}

fn image_path(session: &Session, output_dir: &Path, index: usize) -> std::path::PathBuf {
    let extension = session.images[index]
        .image()
        .and_then(|image| image.format())
        .map(|format| format.file_extension())
        .unwrap_or("bin");
    output_dir.join(format!("image_{}.{}", index, extension))
}

/// Files for a finished attempt: one per loaded image plus the record
pub fn dream_artifacts(
    session: &Session,
    output_dir: &Path,
) -> Result<Vec<DreamArtifact>, ApplicationError> {
    let mut artifacts: Vec<DreamArtifact> = session
        .images
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            slot.image().map(|image| DreamArtifact {
                path: image_path(session, output_dir, index),
                content: image.as_bytes().to_vec(),
            })
        })
        .collect();

    artifacts.push(DreamArtifact {
        path: output_dir.join(RECORD_FILE_NAME),
        content: serde_json::to_vec_pretty(&DreamRecord::from(session))?,
    });

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationClient, ImageData, RemoteError};
    use crate::infrastructure::FileSystemOutputService;
    use async_trait::async_trait;
    use tempfile::TempDir;

    const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    /// Succeeds everywhere except for the listed image slots
    struct StubClient {
        failing_slots: Vec<usize>,
    }

    #[async_trait]
    impl GenerationClient for StubClient {
        async fn generate_tags(&self, prompt: &str) -> Result<Vec<String>, RemoteError> {
            Ok(prompt.split_whitespace().map(str::to_string).collect())
        }

        async fn generate_image(&self, _prompt: &str, slot: usize) -> Result<ImageData, RemoteError> {
            if self.failing_slots.contains(&slot) {
                return Err(RemoteError::http(500, "generator crashed"));
            }
            let mut bytes = PNG.to_vec();
            bytes.push(slot as u8);
            Ok(ImageData::new(bytes))
        }
    }

    fn use_case(failing_slots: Vec<usize>) -> GenerateDreamUseCase {
        let orchestrator = GenerationOrchestrator::new(Arc::new(StubClient { failing_slots }));
        GenerateDreamUseCase::new(orchestrator, Arc::new(FileSystemOutputService::new()))
    }

    #[tokio::test]
    async fn test_execute_writes_images_and_record() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("dream");
        let use_case = use_case(vec![]);

        let response = use_case
            .execute(GenerateDreamRequest {
                prompt: "flying over mountains".to_string(),
                output_dir: Some(output_dir.clone()),
            })
            .await
            .unwrap();

        assert!(response.succeeded());
        assert_eq!(response.tags, vec!["flying", "over", "mountains"]);
        assert_eq!(response.artifacts_count, 5);
        for index in 0..4 {
            let path = output_dir.join(format!("image_{}.png", index));
            assert_eq!(response.images[index].path.as_ref(), Some(&path));
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(bytes.last(), Some(&(index as u8)));
        }

        let record: serde_json::Value =
            serde_json::from_slice(&std::fs::read(output_dir.join(RECORD_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(record["prompt"], "flying over mountains");
        assert_eq!(record["state"], "result");
        assert_eq!(record["images"][0], "loaded");
    }

    #[tokio::test]
    async fn test_failed_slot_is_reported_not_written() {
        let temp_dir = TempDir::new().unwrap();
        let use_case = use_case(vec![2]);

        let response = use_case
            .execute(GenerateDreamRequest {
                prompt: "lost in a maze".to_string(),
                output_dir: Some(temp_dir.path().to_path_buf()),
            })
            .await
            .unwrap();

        assert!(response.succeeded());
        assert_eq!(response.artifacts_count, 4);
        assert!(response.images[2].path.is_none());
        assert_eq!(response.images[2].error.as_ref().unwrap().status, Some(500));
        assert!(!temp_dir.path().join("image_2.png").exists());
        assert!(temp_dir.path().join("image_3.png").exists());
    }

    #[tokio::test]
    async fn test_execute_twice_starts_a_new_attempt() {
        let use_case = use_case(vec![]);
        let request = GenerateDreamRequest {
            prompt: "the ocean".to_string(),
            output_dir: None,
        };

        let first = use_case.execute(request.clone()).await.unwrap();
        let second = use_case.execute(request).await.unwrap();

        assert_eq!(first.attempt, 1);
        assert_eq!(second.attempt, 2);
        assert_eq!(first.session_id, second.session_id);
        assert_eq!(second.artifacts_count, 0);
        assert!(second.output_path.is_none());
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_prompt() {
        let use_case = use_case(vec![]);

        let result = use_case
            .execute(GenerateDreamRequest {
                prompt: String::new(),
                output_dir: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(ApplicationError::ValidationError(_))
        ));
        assert_eq!(use_case.orchestrator().state(), SessionState::Idle);
    }
}
