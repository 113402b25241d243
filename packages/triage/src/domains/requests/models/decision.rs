//! RequestDecision and MatchCandidate models.
//!
//! A decision is the persisted outcome of one matching invocation; candidates
//! are ephemeral and only ever live inside a decision.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{ConfidenceLevel, DispatcherId, RequestId, ResourceId};

/// Which scoring path produced a candidate or decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    RuleBased,
    AiAssisted,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::RuleBased => write!(f, "rule_based"),
            MatchSource::AiAssisted => write!(f, "ai_assisted"),
        }
    }
}

/// Per-factor component scores, each in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComponentScores {
    pub suitability: f64,
    pub availability: f64,
    pub capacity: f64,
    pub distance: f64,
}

impl ComponentScores {
    /// The weakest factor, used for confidence degradation and trade-offs.
    pub fn min(&self) -> f64 {
        self.suitability
            .min(self.availability)
            .min(self.capacity)
            .min(self.distance)
    }
}

/// A scored, explained pairing of one request with one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub scores: ComponentScores,
    /// Weighted final score in [0, 1].
    pub final_score: f64,
    pub distance_km: Option<f64>,
    /// Estimated minutes until the resource reaches the request location.
    /// `None` when the request location is unresolved.
    pub estimated_arrival_minutes: Option<u32>,
    /// Ordered human-readable reasoning steps.
    pub reasoning: Vec<String>,
    /// Ordered trade-off notes.
    pub trade_offs: Vec<String>,
    pub confidence: ConfidenceLevel,
    pub source: MatchSource,
}

/// The human dispatcher's final decision on a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum HumanOutcome {
    Dispatched {
        resource_id: ResourceId,
        /// Set when the dispatcher selected a different resource than the
        /// top recommendation.
        overrode_recommendation: Option<ResourceId>,
    },
    Cancelled,
}

/// Resolution metadata attached once a human acts on a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: HumanOutcome,
    pub dispatcher_id: DispatcherId,
    pub notes: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

/// The persisted outcome of one matching invocation, pending human action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDecision {
    pub request_id: RequestId,
    /// Rank order = list order; ties broken by resource id ascending.
    pub candidates: Vec<MatchCandidate>,
    pub path: MatchSource,
    /// Why the AI path was abandoned, when it was attempted and failed.
    pub fallback_reason: Option<String>,
    /// Always true: no decision is ever auto-committed.
    pub human_action_required: bool,
    /// Concerns the dispatcher should review before confirming.
    pub warnings: Vec<String>,
    pub decided_at: DateTime<Utc>,
    pub resolution: Option<Resolution>,
}

impl RequestDecision {
    pub fn new(
        request_id: RequestId,
        candidates: Vec<MatchCandidate>,
        path: MatchSource,
        fallback_reason: Option<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            request_id,
            candidates,
            path,
            fallback_reason,
            human_action_required: true,
            warnings,
            decided_at: Utc::now(),
            resolution: None,
        }
    }

    pub fn top_candidate(&self) -> Option<&MatchCandidate> {
        self.candidates.first()
    }

    /// Whether the given resource appears in the candidate list.
    pub fn contains(&self, resource_id: &ResourceId) -> bool {
        self.candidates.iter().any(|c| &c.resource_id == resource_id)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}
