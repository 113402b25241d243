//! Engine error taxonomy.
//!
//! AI-path failures are deliberately absent here: the coordinator absorbs
//! them via rule-based fallback and they never surface as request errors.

use thiserror::Error;

use super::{RequestId, ResourceId};

/// Errors surfaced by the engine to its callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The registry returned no eligible resources. The request stays
    /// `pending` and is flagged for manual follow-up.
    #[error("No eligible resources for request {request_id}")]
    NoCandidates { request_id: RequestId },

    /// A confirmation referenced a resource that is no longer eligible
    /// (not in the decision, state changed since scoring, or a racing
    /// commit won). The request stays `processing` awaiting re-selection.
    #[error("Resource {resource_id} is no longer available for request {request_id}: {reason}")]
    ResourceNoLongerAvailable {
        request_id: RequestId,
        resource_id: ResourceId,
        reason: String,
    },

    /// The requested transition does not exist in the lifecycle machine.
    /// Request state is unchanged.
    #[error("Invalid state transition for request {request_id}: {attempted} from state {current_state}")]
    InvalidStateTransition {
        request_id: RequestId,
        current_state: String,
        attempted: String,
    },

    /// The request is not known to the lifecycle machine.
    #[error("Unknown request {request_id}")]
    UnknownRequest { request_id: RequestId },

    /// Malformed weights or thresholds. Fatal at startup, never raised at
    /// request time.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
