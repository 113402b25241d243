// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. What to ask the
// reasoning service, and how to validate its answers, lives in the matching
// domain.

use anyhow::Result;
use async_trait::async_trait;

/// Generic access to the external reasoning service.
///
/// The AI-assisted scorer is the only consumer. Implementations must be
/// cancel-safe: the coordinator drops in-flight calls on timeout.
#[async_trait]
pub trait BaseReasoning: Send + Sync {
    /// Send a system directive + user prompt and return the raw text
    /// response. Parse with serde_json in calling code.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}
