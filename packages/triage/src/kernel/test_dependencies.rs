// Mock implementations for testing
//
// Provides a scriptable reasoning service that can be injected into the
// coordinator in place of the real client.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::sleep;

use super::BaseReasoning;

/// Scripted behavior for a single mock call.
#[derive(Debug, Clone)]
enum MockBehavior {
    /// Return this text after an optional delay.
    Respond { body: String, delay: Duration },
    /// Fail with this error message.
    Fail(String),
    /// Sleep long enough that any sane coordinator timeout fires first.
    Hang,
}

/// Mock reasoning service with scriptable responses.
///
/// Responses are consumed in order; when the script runs out the last
/// behavior repeats. Calls are recorded for assertion.
pub struct MockReasoning {
    script: Arc<Mutex<Vec<MockBehavior>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockReasoning {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful text response.
    pub fn with_response(self, body: impl Into<String>) -> Self {
        self.script.lock().unwrap().push(MockBehavior::Respond {
            body: body.into(),
            delay: Duration::ZERO,
        });
        self
    }

    /// Queue a successful response delivered after `delay`.
    pub fn with_delayed_response(self, body: impl Into<String>, delay: Duration) -> Self {
        self.script.lock().unwrap().push(MockBehavior::Respond {
            body: body.into(),
            delay,
        });
        self
    }

    /// Queue a hard failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push(MockBehavior::Fail(message.into()));
        self
    }

    /// Queue a call that never returns in test time.
    pub fn with_hang(self) -> Self {
        self.script.lock().unwrap().push(MockBehavior::Hang);
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The (system, user) prompt pairs sent so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn next_behavior(&self) -> Option<MockBehavior> {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            Some(script.remove(0))
        } else {
            script.first().cloned()
        }
    }
}

impl Default for MockReasoning {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseReasoning for MockReasoning {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));

        match self.next_behavior() {
            Some(MockBehavior::Respond { body, delay }) => {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                Ok(body)
            }
            Some(MockBehavior::Fail(message)) => Err(anyhow::anyhow!(message)),
            Some(MockBehavior::Hang) => {
                sleep(Duration::from_secs(3600)).await;
                unreachable!("mock hang should always be cancelled by a timeout")
            }
            None => Err(anyhow::anyhow!("MockReasoning has no scripted response")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_are_consumed_in_order_and_last_repeats() {
        let mock = MockReasoning::new()
            .with_response("first")
            .with_response("second");

        assert_eq!(mock.complete("s", "u").await.unwrap(), "first");
        assert_eq!(mock.complete("s", "u").await.unwrap(), "second");
        assert_eq!(mock.complete("s", "u").await.unwrap(), "second");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn scripted_failure_is_returned() {
        let mock = MockReasoning::new().with_failure("boom");
        assert!(mock.complete("s", "u").await.is_err());
    }
}
