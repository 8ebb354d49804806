use crate::config::TextGenerationSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SYSTEM_PROMPT: &str =
    "You are an analyst at a venture platform. You write short, factual deal memos.";

#[derive(Debug, Error)]
pub enum TextGenerationError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Completion contained no text")]
    EmptyCompletion,

    #[error("Text generation is not configured")]
    NotConfigured,
}

/// Prompt in, text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, TextGenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for any OpenAI-compatible endpoint
pub struct ChatCompletionClient {
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: Client,
}

impl ChatCompletionClient {
    pub fn new(settings: &TextGenerationSettings) -> Result<Self, TextGenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String, TextGenerationError> {
        if self.api_key.is_empty() {
            return Err(TextGenerationError::NotConfigured);
        }

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.4,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Text generation failed: {} - {}", status, body);
            return Err(TextGenerationError::ApiError(format!(
                "Completion request failed: {}",
                status
            )));
        }

        let completion: ChatResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(TextGenerationError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn settings(endpoint: String) -> TextGenerationSettings {
        TextGenerationSettings {
            endpoint,
            api_key: "sk-test".to_string(),
            model: "test-model".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_generate_returns_completion_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({"model": "test-model", "max_tokens": 600})),
                Matcher::Regex("Summarise".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  Memo text.  "}}]}"#)
            .create_async()
            .await;

        let client = ChatCompletionClient::new(&settings(server.url())).unwrap();
        let text = client.generate("Summarise").await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Memo text.");
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .create_async()
            .await;

        let client = ChatCompletionClient::new(&settings(server.url())).unwrap();
        assert!(matches!(
            client.generate("x").await,
            Err(TextGenerationError::ApiError(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_completion() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = ChatCompletionClient::new(&settings(server.url())).unwrap();
        assert!(matches!(
            client.generate("x").await,
            Err(TextGenerationError::EmptyCompletion)
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = ChatCompletionClient::new(&TextGenerationSettings::default()).unwrap();
        assert!(matches!(
            client.generate("x").await,
            Err(TextGenerationError::NotConfigured)
        ));
    }
}
