//! Bridge between the reasoning-client crate and the engine's trait seam.
//!
//! `reasoning_client::ReasoningClient` is a pure REST client with its own
//! error type. This wrapper implements `BaseReasoning` for it so the
//! matching domain depends only on the trait.

use anyhow::Result;
use async_trait::async_trait;
use reasoning_client::ReasoningClient;

use super::BaseReasoning;
use crate::config::Config;

/// Wrapper around the reasoning-service client that implements engine traits.
#[derive(Clone)]
pub struct ReasoningBridge {
    client: ReasoningClient,
}

impl ReasoningBridge {
    /// Create a new bridge from an existing client instance.
    pub fn new(client: ReasoningClient) -> Self {
        Self { client }
    }

    /// Build a client from engine configuration.
    ///
    /// Returns `None` when no reasoning service is configured; the
    /// coordinator then runs rule-based only.
    pub fn from_config(config: &Config) -> Option<Self> {
        let base_url = config.reasoning_base_url.as_ref()?;
        let client = ReasoningClient::new(base_url)
            .with_model(&config.reasoning_model)
            .with_timeout(config.reasoning_timeout);
        Some(Self::new(client))
    }

    /// Get a reference to the underlying client.
    pub fn inner(&self) -> &ReasoningClient {
        &self.client
    }
}

#[async_trait]
impl BaseReasoning for ReasoningBridge {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.client
            .complete(system, user)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_a_base_url() {
        let config = Config::default();
        assert!(ReasoningBridge::from_config(&config).is_none());

        let config = Config {
            reasoning_base_url: Some("http://localhost:9000".to_string()),
            ..Config::default()
        };
        assert!(ReasoningBridge::from_config(&config).is_some());
    }
}
