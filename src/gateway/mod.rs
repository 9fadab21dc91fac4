//! AI gateway: one resolved Gemini model behind a failure-proof interface.
//!
//! # Architecture
//!
//! - [`ModelBackend`]: the wire-level seam (probe a model id, generate text
//!   from a turn history)
//! - [`gemini::GeminiClient`]: the REST implementation of that seam
//! - [`AiGateway`]: resolves one model at startup from an ordered fallback
//!   list, then serves single-turn [`AiGateway::complete`] and multi-turn
//!   [`AiGateway::chat`] calls
//!
//! # Failure Policy
//!
//! Model resolution is the only fallible step. After that, every call returns
//! a `String`: either the model's text or a user-facing failure message.
//! Rate-limit failures (`429` or `quota` in the error) get a dedicated
//! message. Nothing is retried; the user re-triggers the action.

pub mod gemini;

use crate::models::ChatMessage;
use crate::utils::{truncate_chars, truncate_for_log};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub const QUOTA_EXCEEDED_MESSAGE: &str = "**API Quota Exceeded!** Please wait a minute.";

/// Characters of an error message kept in user-facing failure text.
pub const ERROR_EXCERPT_CHARS: usize = 200;

/// Errors from model resolution and model calls.
///
/// The `Display` text is what quota detection inspects, so
/// [`GatewayError::Api`] always leads with the HTTP status.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Non-2xx response, with the message from the API's error body.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    /// Connection, timeout or decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A 2xx response without any text, e.g. a blocked prompt.
    #[error("model returned no text: {0}")]
    EmptyResponse(String),
    /// Every candidate model failed its probe.
    #[error("no usable model among {0:?}")]
    NoUsableModel(Vec<String>),
}

/// Wire-level access to a hosted model.
pub trait ModelBackend {
    /// Check that `model` exists and is usable with the configured key.
    async fn probe(&self, model: &str) -> Result<(), GatewayError>;

    /// Generate a reply to `history`, whose last entry is the new user turn.
    async fn generate(
        &self,
        model: &str,
        history: &[ChatMessage],
        timeout: Duration,
    ) -> Result<String, GatewayError>;
}

/// `true` when the error text signals a rate limit or exhausted quota.
pub fn is_quota_error(message: &str) -> bool {
    message.contains("429") || message.to_lowercase().contains("quota")
}

/// User-facing text for a failed single-turn call.
///
/// # Returns
///
/// [`QUOTA_EXCEEDED_MESSAGE`] for rate-limit failures, otherwise
/// `"AI call failed: <first 200 chars of the error>..."`.
pub fn describe_failure(err: &GatewayError) -> String {
    let message = err.to_string();
    if is_quota_error(&message) {
        QUOTA_EXCEEDED_MESSAGE.to_string()
    } else {
        format!("AI call failed: {}...", truncate_chars(&message, ERROR_EXCERPT_CHARS))
    }
}

/// Model-facing history of the general chat.
///
/// A turn pair is appended only after the model answered, so a failed send
/// leaves the history as it was.
#[derive(Debug, Default, Clone)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Committed turns, oldest first, alternating user and assistant.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}

/// The one resolved model, shared by every AI action in a session.
///
/// Built only through [`AiGateway::resolve`], so holding one means a model
/// answered its probe. Calls never return errors; see the module docs for the
/// failure policy.
#[derive(Debug)]
pub struct AiGateway<B> {
    backend: B,
    model: String,
    timeout: Duration,
}

impl<B: ModelBackend> AiGateway<B> {
    /// Probe `candidates` in order and keep the first usable one.
    ///
    /// # Arguments
    ///
    /// * `backend` - Wire client used for probing and, afterwards, every call
    /// * `candidates` - Model ids in preference order
    /// * `timeout` - Per-call limit for [`AiGateway::complete`] and [`AiGateway::chat`]
    ///
    /// # Errors
    ///
    /// [`GatewayError::NoUsableModel`] when every probe fails. Callers treat
    /// this as fatal.
    #[instrument(level = "info", skip(backend))]
    pub async fn resolve(
        backend: B,
        candidates: &[String],
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        for candidate in candidates {
            match backend.probe(candidate).await {
                Ok(()) => {
                    info!(model = %candidate, "Resolved model");
                    return Ok(Self {
                        backend,
                        model: candidate.clone(),
                        timeout,
                    });
                }
                Err(e) => warn!(model = %candidate, error = %e, "Model unavailable; trying next"),
            }
        }
        error!(?candidates, "No candidate model could be initialized");
        Err(GatewayError::NoUsableModel(candidates.to_vec()))
    }

    /// Id of the resolved model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single-turn request. Returns trimmed model text or a failure message.
    #[instrument(level = "info", skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> String {
        let t0 = Instant::now();
        let turn = [ChatMessage::user(prompt)];
        match self.backend.generate(&self.model, &turn, self.timeout).await {
            Ok(text) => {
                info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Completion succeeded");
                text.trim().to_string()
            }
            Err(e) => {
                warn!(
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    error = %truncate_for_log(&e.to_string(), 300),
                    "Completion failed"
                );
                describe_failure(&e)
            }
        }
    }

    /// Multi-turn request on `session`. Failures are returned as text and do
    /// not touch the session history.
    #[instrument(level = "info", skip_all, fields(model = %self.model, turns = session.history.len()))]
    pub async fn chat(&self, session: &mut ChatSession, message: &str) -> String {
        let mut turns = session.history.clone();
        turns.push(ChatMessage::user(message));

        match self.backend.generate(&self.model, &turns, self.timeout).await {
            Ok(reply) => {
                session.history = turns;
                session.history.push(ChatMessage::assistant(reply.clone()));
                reply
            }
            Err(e) => {
                warn!(error = %e, "Chat message failed");
                format!("Chat failed: {}", truncate_chars(&e.to_string(), ERROR_EXCERPT_CHARS))
            }
        }
    }
}
