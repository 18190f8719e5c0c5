//! HTTP-based generation client for the tag and image services

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::core::config::ServiceConfig;
use crate::generation::{GenerationClient, ImageData, ImageFormat, RemoteError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagsRequest<'a> {
    dream_prompt: &'a str,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
}

/// Calls the remote tag and image generators over HTTP(S)
pub struct HttpGenerationClient {
    client: Client,
    tags_url: Url,
    image_url: Url,
}

impl HttpGenerationClient {
    pub fn new(config: &ServiceConfig) -> crate::core::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            tags_url: config.tags_url.clone(),
            image_url: config.image_url.clone(),
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &Url, body: &B) -> Result<Response, RemoteError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = if detail.trim().is_empty() {
                format!("HTTP {} from {}", status, url)
            } else {
                format!("HTTP {} from {}: {}", status, url, detail.trim())
            };
            return Err(RemoteError::http(status.as_u16(), message));
        }

        Ok(response)
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate_tags(&self, prompt: &str) -> Result<Vec<String>, RemoteError> {
        let response = self
            .post(&self.tags_url, &TagsRequest {
                dream_prompt: prompt,
            })
            .await?;
        let status = response.status().as_u16();

        let tags: Vec<String> = response.json().await.map_err(|e| {
            RemoteError::http(status, format!("Failed to decode tags response: {}", e))
        })?;

        let tags: Vec<String> = tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        debug!(count = tags.len(), "received tags");
        Ok(tags)
    }

    async fn generate_image(&self, prompt: &str, slot: usize) -> Result<ImageData, RemoteError> {
        let response = self.post(&self.image_url, &ImageRequest { prompt }).await?;
        let status = response.status().as_u16();

        let bytes = response.bytes().await.map_err(|e| {
            RemoteError::http(status, format!("Failed to read image body: {}", e))
        })?;

        let format = ImageFormat::detect(&bytes).ok_or_else(|| {
            RemoteError::http(status, "Failed to create image from data")
        })?;
        debug!(slot, bytes = bytes.len(), format = format.mime_type(), "received image");

        Ok(ImageData::new(bytes.to_vec()))
    }
}

fn transport_error(url: &Url, error: reqwest::Error) -> RemoteError {
    let message = if error.is_timeout() {
        format!("Request to {} timed out", url)
    } else {
        format!("Request to {} failed: {}", url, error)
    };
    RemoteError::new(error.status().map(|s| s.as_u16()), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn client_for(server: &MockServer) -> HttpGenerationClient {
        let config = ServiceConfig {
            tags_url: Url::parse(&format!("{}/tags", server.uri())).unwrap(),
            image_url: Url::parse(&format!("{}/image", server.uri())).unwrap(),
            timeout_secs: 5,
        };
        HttpGenerationClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_generate_tags_keeps_order_and_drops_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tags"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "dreamPrompt": "flying over mountains" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!(["sky", "", "mountains", "  ", "flight"])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let tags = client.generate_tags("flying over mountains").await.unwrap();

        assert_eq!(tags, vec!["sky", "mountains", "flight"]);
    }

    #[tokio::test]
    async fn test_generate_tags_http_error_carries_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tags"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let error = client.generate_tags("a dream").await.unwrap_err();

        assert_eq!(error.status, Some(503));
        assert!(error.message.contains("HTTP 503"));
        assert!(error.message.contains("overloaded"));
    }

    #[tokio::test]
    async fn test_generate_tags_rejects_malformed_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tags": ["sky"] })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let error = client.generate_tags("a dream").await.unwrap_err();

        assert_eq!(error.status, Some(200));
        assert!(error.message.contains("Failed to decode tags response"));
    }

    #[tokio::test]
    async fn test_generate_image_returns_whole_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/image"))
            .and(body_json(json!({ "prompt": "a dream" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(PNG.to_vec())
                    .insert_header("content-type", "image/png"),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let image = client.generate_image("a dream", 0).await.unwrap();

        assert_eq!(image.as_bytes(), &PNG);
        assert_eq!(image.format(), Some(ImageFormat::Png));
    }

    #[tokio::test]
    async fn test_generate_image_rejects_non_image_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/image"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>error</html>"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let error = client.generate_image("a dream", 3).await.unwrap_err();

        assert_eq!(error.message, "Failed to create image from data");
    }

    #[tokio::test]
    async fn test_generate_image_timeout_has_no_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/image"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(PNG.to_vec())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let config = ServiceConfig {
            tags_url: Url::parse(&format!("{}/tags", mock_server.uri())).unwrap(),
            image_url: Url::parse(&format!("{}/image", mock_server.uri())).unwrap(),
            timeout_secs: 1,
        };
        let client = HttpGenerationClient::new(&config).unwrap();
        let error = client.generate_image("a dream", 1).await.unwrap_err();

        assert!(error.status.is_none());
        assert!(error.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let config = ServiceConfig {
            tags_url: Url::parse("http://127.0.0.1:9/tags").unwrap(),
            image_url: Url::parse("http://127.0.0.1:9/image").unwrap(),
            timeout_secs: 2,
        };
        let client = HttpGenerationClient::new(&config).unwrap();
        let error = client.generate_tags("a dream").await.unwrap_err();

        assert!(error.status.is_none());
        assert!(error.message.contains("failed") || error.message.contains("timed out"));
    }
}
