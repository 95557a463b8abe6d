//! Gemini API client
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use reqwest::Client;
use std::time::Duration;
use async_trait::async_trait;
use crate::error::OrchestrationError;
use crate::llm::LanguageModel;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: i32,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build pooled HTTP client, using defaults: {}", e);
                Client::new()
            });

        Self {
            client,
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: 0.0,
            max_output_tokens: 2048,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model)
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    /// Generate a completion for a single prompt
    pub async fn generate(&self, prompt: &str) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::ModelInvocationError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let request = self.build_request(prompt);

        info!(model = %self.model, prompt_chars = prompt.chars().count(), "Calling Gemini API");

        let response = self.client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                OrchestrationError::ModelInvocationError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(OrchestrationError::ModelInvocationError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            OrchestrationError::ModelInvocationError(format!("Gemini parse error: {}", e))
        })?;

        let answer = extract_text(&gemini_response)?;

        if let Some(usage) = &gemini_response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                completion_tokens = usage.candidates_token_count,
                "Gemini token usage"
            );
        }

        Ok(answer)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> crate::Result<String> {
        self.generate(prompt).await
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &GeminiResponse) -> crate::Result<String> {
    let candidate = response.candidates.first().ok_or_else(|| {
        OrchestrationError::ModelInvocationError("No response from Gemini API".to_string())
    })?;

    let text: String = candidate
        .content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect();

    if text.trim().is_empty() {
        return Err(OrchestrationError::ModelInvocationError(format!(
            "Empty response from Gemini (finish_reason={:?})",
            candidate.finish_reason
        )));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i32,
    #[serde(default)]
    candidates_token_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let client = GeminiClient::new("key".into()).with_temperature(0.7);
        let json = serde_json::to_value(client.build_request("청년 정책자금 알려줘")).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "청년 정책자금 알려줘");
        assert!(json["generationConfig"]["maxOutputTokens"].is_number());
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "첫 줄\n" }, { "text": "둘째 줄" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5 }
        }))
        .unwrap();

        assert_eq!(extract_text(&response).unwrap(), "첫 줄\n둘째 줄");
    }

    #[test]
    fn test_extract_text_rejects_empty_candidates() {
        let response: GeminiResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            extract_text(&response),
            Err(OrchestrationError::ModelInvocationError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new(String::new());
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::ModelInvocationError(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
