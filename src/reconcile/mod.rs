//! Chat-model reconciliation
//!
//! Turns the rolling window of noisy OCR readings into a single best-guess
//! phrase by asking an OpenAI-compatible chat-completions endpoint to vote
//! across the candidates. The call runs synchronously on the primary loop at
//! freeze time; freezing already means the user wants a pause.

use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

/// Reply meaning the model found no consistent reading among the candidates
pub const NO_CONSENSUS: &str = "None";

/// Sentinel shown as the reconciled text when the remote call failed
pub const RECONCILE_FAILED: &str = "Error";

/// Instruction fixed for every reconciliation request. The model must
/// answer with the single most consistently detected phrase, or the literal
/// token "None" when the candidates do not agree.
const SYSTEM_PROMPT: &str = "You will receive a list named latest_ocr_values \
containing repeated OCR readings of the same physical text, for example \
['I am a Python', 'I a pthon', 'I python', 'I am a python', 'a']. Reply with \
only the text that the readings most consistently agree on. If several \
answers are possible, pick the single most likely one. If there is no clear \
answer, reply with 'None'. Do not explain your choice and do not include \
anything else in the reply.";

/// Instruction for follow-up questions after a freeze
const CHAT_PROMPT: &str = "You are a helpful assistant answering follow-up \
questions about a piece of text that was just read from a live camera feed. \
Keep answers short and factual.";

/// Errors from the chat endpoint
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// HTTP transport or connection error
    #[error("request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status
    #[error("endpoint returned status {0}")]
    Status(u16),

    /// The response body was not the expected JSON shape
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The response carried no usable text content
    #[error("response contained no text")]
    Empty,
}

impl From<reqwest::Error> for ReconcileError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ReconcileError::Timeout
        } else {
            ReconcileError::Request(e.to_string())
        }
    }
}

/// Reconciliation capability.
///
/// The session maps `Err` to the [`RECONCILE_FAILED`] sentinel before the
/// value reaches the user, so implementations never need to produce it
/// themselves.
pub trait Reconciler {
    fn reconcile(&self, candidates: &[String]) -> Result<String, ReconcileError>;
}

/// Chat endpoint configuration
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Endpoint base URL; `/chat/completions` is appended
    pub base_url: String,
    /// Bearer token; omitted from the request when empty
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.perplexity.ai".to_string(),
            api_key: None,
            model: "mistral-7b-instruct".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Reconciler over an OpenAI-compatible `/chat/completions` endpoint
pub struct ChatReconciler {
    client: reqwest::blocking::Client,
    config: ReconcileConfig,
}

impl ChatReconciler {
    /// Build a reconciler from configuration; the HTTP client carries the
    /// configured per-request timeout
    pub fn from_config(config: &ReconcileConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Ask a free-form follow-up question, optionally anchored to the last
    /// reconciled reading
    pub fn chat(&self, question: &str, context: Option<&str>) -> Result<String, ReconcileError> {
        let user_message = match context {
            Some(reading) => format!("The camera read: \"{reading}\"\n\n{question}"),
            None => question.to_string(),
        };
        self.complete(CHAT_PROMPT, &user_message)
    }

    /// One chat-completion round trip
    fn complete(&self, system: &str, user: &str) -> Result<String, ReconcileError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user",   "content": user   }
            ]
        });

        let mut request = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;

        if !response.status().is_success() {
            return Err(ReconcileError::Status(response.status().as_u16()));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| ReconcileError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(ReconcileError::Empty)?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(ReconcileError::Empty);
        }

        Ok(content)
    }
}

impl Reconciler for ChatReconciler {
    fn reconcile(&self, candidates: &[String]) -> Result<String, ReconcileError> {
        if candidates.is_empty() {
            debug!("No readings to reconcile");
            return Ok(NO_CONSENSUS.to_string());
        }

        let prompt = build_prompt(candidates);
        info!("Reconciling {} readings", candidates.len());

        self.complete(SYSTEM_PROMPT, &prompt)
    }
}

/// Serialize the candidate readings into the prompt the model expects
fn build_prompt(candidates: &[String]) -> String {
    let list = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());
    format!("latest_ocr_values = {list}")
}
