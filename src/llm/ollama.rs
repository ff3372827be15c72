//! Ollama HTTP adapter for the narrative backend trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::OllamaConfig;
use crate::types::{AppError, AppResult};

use super::{Availability, NarrativeBackend};

pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    num_predict: u32,
    num_ctx: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
    num_ctx: u32,
    repeat_penalty: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaBackend {
    pub fn new(config: &OllamaConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Narrative(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            num_predict: config.num_predict,
            num_ctx: config.num_ctx,
        })
    }

    #[cfg(test)]
    fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: "llama3.2".to_string(),
            num_predict: 250,
            num_ctx: 2048,
        }
    }
}

#[async_trait]
impl NarrativeBackend for OllamaBackend {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.3,
                top_p: 0.9,
                num_predict: self.num_predict,
                num_ctx: self.num_ctx,
                repeat_penalty: 1.1,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Narrative(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Narrative(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Narrative(format!("Invalid Ollama response: {e}")))?;

        match payload.response {
            Some(text) if !text.trim().is_empty() => {
                debug!(chars = text.len(), "Ollama response received");
                Ok(text.trim().to_string())
            }
            _ => Err(AppError::Narrative("Ollama response missing text".to_string())),
        }
    }

    async fn check_availability(&self) -> Availability {
        match self.list_models().await {
            Ok(models) => {
                info!(model = %self.model, count = models.len(), "Ollama is available");
                Availability { available: true, models, error: None }
            }
            Err(e) => {
                error!(error = %e, url = %self.base_url, "Ollama availability check failed");
                Availability { available: false, models: vec![], error: Some(e.to_string()) }
            }
        }
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| AppError::Narrative(format!("Ollama request failed: {e}")))?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Narrative(format!("Invalid Ollama response: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_posts_generate_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "llama3.2",
                "stream": false,
                "options": { "temperature": 0.3, "num_predict": 250, "num_ctx": 2048 }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": "  Revenue grew 50% quarter over quarter.  "}"#)
            .create_async()
            .await;

        let backend = OllamaBackend::with_base_url(&server.url());
        let text = backend.complete("analyze financials").await.unwrap();
        assert_eq!(text, "Revenue grew 50% quarter over quarter.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_response_field_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"done": true}"#)
            .create_async()
            .await;

        let backend = OllamaBackend::with_base_url(&server.url());
        let err = backend.complete("prompt").await.unwrap_err();
        assert!(err.to_string().contains("missing text"));
    }

    #[tokio::test]
    async fn http_error_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .with_status(500)
            .create_async()
            .await;

        let backend = OllamaBackend::with_base_url(&server.url());
        assert!(backend.complete("prompt").await.is_err());
    }

    #[tokio::test]
    async fn availability_reports_models() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models": [{"name": "llama3.2"}, {"name": "mistral"}]}"#)
            .create_async()
            .await;

        let backend = OllamaBackend::with_base_url(&server.url());
        let availability = backend.check_availability().await;
        assert!(availability.available);
        assert_eq!(availability.models, vec!["llama3.2", "mistral"]);
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        // Port 1 is never listening.
        let backend = OllamaBackend::with_base_url("http://127.0.0.1:1");
        let availability = backend.check_availability().await;
        assert!(!availability.available);
        assert!(availability.error.is_some());
    }
}
