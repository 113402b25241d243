//! Matching domain: rule-based scoring, AI-assisted scoring and the
//! coordinator that chooses between them.

pub mod ai_scorer;
pub mod coordinator;
pub mod scorer;

use serde::{Deserialize, Serialize};

pub use ai_scorer::{AiScorer, ScorerFailure};
pub use coordinator::MatchCoordinator;
pub use scorer::score_resources;

/// How the coordinator should select a scoring path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Policy decides: AI when enabled, configured and confident enough.
    Auto,
    /// Prefer the AI path, but hard failure still falls back.
    ForcedAi,
    /// Deterministic scorer only.
    ForcedRule,
}
