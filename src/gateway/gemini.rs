//! Gemini `generateContent` REST client.
//!
//! # Endpoints
//!
//! | Call | Method | Path |
//! |------|--------|------|
//! | probe | `GET` | `{base}/models/{model}` |
//! | generate | `POST` | `{base}/models/{model}:generateContent` |
//!
//! The API key travels in the `x-goog-api-key` header so it never shows up
//! in logged URLs. Non-2xx responses become [`GatewayError::Api`] carrying
//! the HTTP status, which is what the gateway's quota detection keys on.

use super::{GatewayError, ModelBackend};
use crate::models::{ChatMessage, ChatRole};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const API_KEY_HEADER: &str = "x-goog-api-key";
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Safety categories relaxed for news content, which routinely describes
/// conflict and crime.
const SAFETY_OVERRIDES: [(&str, &str); 1] = [("HARM_CATEGORY_HARASSMENT", "BLOCK_NONE")];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

fn build_request(history: &[ChatMessage]) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: history
            .iter()
            .map(|m| Content {
                role: wire_role(m.role),
                parts: vec![Part { text: &m.content }],
            })
            .collect(),
        safety_settings: SAFETY_OVERRIDES
            .iter()
            .map(|&(category, threshold)| SafetySetting {
                category,
                threshold,
            })
            .collect(),
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, GatewayError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let feedback = response
            .prompt_feedback
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(GatewayError::EmptyResponse(feedback));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GatewayError::EmptyResponse(
            candidate
                .finish_reason
                .unwrap_or_else(|| "empty candidate".to_string()),
        ));
    }
    Ok(text)
}

/// Turn a non-2xx response into [`GatewayError::Api`], preferring the
/// message from Google's JSON error envelope.
async fn api_error(response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    GatewayError::Api { status, message }
}

/// [`ModelBackend`] over the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client for `base_url` (e.g.
    /// `https://generativelanguage.googleapis.com/v1beta`).
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root; a trailing slash is ignored
    /// * `api_key` - Sent in the `x-goog-api-key` header on every request
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be built (TLS backend init).
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url, model)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request.header(API_KEY_HEADER, &self.api_key).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }
}

impl ModelBackend for GeminiClient {
    #[instrument(level = "debug", skip(self))]
    async fn probe(&self, model: &str) -> Result<(), GatewayError> {
        let request = self.http.get(self.model_url(model)).timeout(PROBE_TIMEOUT);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, history), fields(turns = history.len()))]
    async fn generate(
        &self,
        model: &str,
        history: &[ChatMessage],
        timeout: Duration,
    ) -> Result<String, GatewayError> {
        let url = format!("{}:generateContent", self.model_url(model));
        let request = self
            .http
            .post(url)
            .timeout(timeout)
            .json(&build_request(history));
        let response: GenerateContentResponse = self.send(request).await?.json().await?;
        debug!(candidates = response.candidates.len(), "Received generateContent response");
        extract_text(response)
    }
}
