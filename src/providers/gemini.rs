/*!
 * Gemini generative-language API client.
 *
 * Implements `Translator` through `generateContent` and `TokenCounter`
 * through `countTokens`. No retry happens here: the translation job owns
 * the retry policy.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;
use crate::providers::{TokenCounter, Translator};

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// HTTP client
    client: Client,
    /// Base URL, without the `/v1beta` suffix
    endpoint: String,
    /// Model name
    model: String,
    /// API key
    api_key: String,
}

/// Request body shared by `generateContent` and `countTokens`
#[derive(Debug, Serialize)]
pub struct ContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    pub total_tokens: u64,
}

impl ContentRequest {
    pub fn from_text(text: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: text.to_string() }],
            }],
        }
    }
}

impl GeminiClient {
    /// Create a client from the translation config. An empty API key is an error.
    pub fn new(config: &TranslationConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(ProviderError::AuthenticationError("Gemini API key is not configured".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.endpoint, self.model, method)
    }

    async fn post<R: DeserializeOwned>(&self, method: &str, body: &ContentRequest) -> Result<R, ProviderError> {
        let url = self.method_url(method);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(status_error(status, error_text));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

/// Map a non-success HTTP status to a provider error
fn status_error(status: StatusCode, message: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

/// Pull the generated text out of a `generateContent` response
pub fn extract_text(response: &GenerateContentResponse) -> Result<String, ProviderError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_ref())
    {
        return Err(ProviderError::ContentBlocked(reason.clone()));
    }

    let text = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .map(|part| part.text.clone())
        .ok_or(ProviderError::EmptyResponse)?;

    Ok(text)
}

#[async_trait]
impl Translator for GeminiClient {
    async fn translate(&self, prompt: &str) -> Result<String, ProviderError> {
        let response: GenerateContentResponse = self.post("generateContent", &ContentRequest::from_text(prompt)).await?;
        extract_text(&response)
    }
}

#[async_trait]
impl TokenCounter for GeminiClient {
    async fn count_tokens(&self, text: &str) -> Result<u64, ProviderError> {
        let response: CountTokensResponse = self.post("countTokens", &ContentRequest::from_text(text)).await?;
        Ok(response.total_tokens)
    }
}
