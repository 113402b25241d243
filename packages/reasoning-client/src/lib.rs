//! Pure REST client for the external reasoning service.
//!
//! A clean, minimal chat-completion client with no domain-specific logic.
//! The triage engine layers its prompts, schema validation and fallback
//! policy on top of this crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use reasoning_client::ReasoningClient;
//!
//! let client = ReasoningClient::from_env()?;
//! let text = client
//!     .complete("You rank emergency resources.", "Rank these candidates...")
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{ReasoningError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

const DEFAULT_MODEL: &str = "gpt-4-turbo";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reasoning service API client.
#[derive(Debug, Clone)]
pub struct ReasoningClient {
    http_client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl ReasoningClient {
    /// Create a client for the given service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: None,
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variables `REASONING_BASE_URL` and
    /// (optionally) `REASONING_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("REASONING_BASE_URL")
            .map_err(|_| ReasoningError::Config("REASONING_BASE_URL not set".into()))?;
        let mut client = Self::new(base_url);
        client.api_key = std::env::var("REASONING_API_KEY").ok();
        Ok(client)
    }

    /// Set the bearer token sent with each request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model identifier used for completions.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the network deadline for a single call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a system + user prompt pair and return the raw text response.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system), Message::user(user)],
            temperature: Some(0.3),
            max_tokens: Some(2000),
        };
        self.chat_completion(request).await
    }

    /// Low-level completion call.
    pub async fn chat_completion(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling reasoning service"
        );

        let mut builder = self
            .http_client
            .post(&url)
            .timeout(self.timeout)
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(timeout = ?self.timeout, "Reasoning service call timed out");
                ReasoningError::Timeout(self.timeout)
            } else {
                ReasoningError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Api(format!("{status}: {body}")));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Parse(e.to_string()))?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ReasoningError::Parse("response contained no choices".into()))?;

        debug!(response_length = content.len(), "Reasoning service responded");

        Ok(content)
    }
}
