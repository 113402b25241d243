//! AI-assisted scorer.
//!
//! Builds the prompt, calls the reasoning service through `BaseReasoning`
//! and validates the response into `MatchCandidate`s. Every failure mode is
//! typed as `ScorerFailure` so the coordinator can fall back; nothing here
//! ever reaches the caller of the engine.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::common::{distance_km, ConfidenceLevel, ResourceId};
use crate::domains::requests::models::{ComponentScores, MatchCandidate, MatchSource, NeedRequest};
use crate::domains::resources::models::Resource;
use crate::kernel::BaseReasoning;

/// Fixed system directive sent with every scoring call. The reasoning
/// service advises; it never decides.
pub const SYSTEM_DIRECTIVE: &str = "\
You are a resource-matching assistant for an emergency crisis triage system. \
Your role is strictly advisory: a human dispatcher reviews and confirms every \
recommendation before any resource is dispatched.

Required behaviors:
- Justify every recommendation with explicit reasoning the dispatcher can verify.
- Always defer the final decision to the human dispatcher; never claim authority to act.
- Flag uncertainty explicitly wherever the information is incomplete or ambiguous.
- Recommend only resources from the candidate list you are given; all of them are verified.

Prohibited behaviors:
- Never produce a score without component-level justification.
- Never invent, rename, or reference resources outside the supplied candidate list.
- Never state or imply that a dispatch has been or will be performed automatically.

Respond with JSON only, matching this schema exactly:
{
  \"recommendations\": [
    {
      \"resource_id\": \"<id from the candidate list>\",
      \"final_score\": <0.0-1.0>,
      \"component_scores\": {
        \"suitability\": <0.0-1.0>,
        \"availability\": <0.0-1.0>,
        \"capacity\": <0.0-1.0>,
        \"distance\": <0.0-1.0>
      },
      \"reasoning\": [\"<step>\", ...],
      \"trade_offs\": [\"<concern>\", ...],
      \"confidence\": <0.0-1.0>
    }
  ],
  \"overall_confidence\": <0.0-1.0>,
  \"warnings\": [\"<concern for the dispatcher>\", ...]
}";

/// Why the AI path failed. Always recovered by the coordinator, never
/// surfaced to the engine's caller.
#[derive(Debug, Error)]
pub enum ScorerFailure {
    #[error("reasoning call exceeded the {0:?} deadline")]
    Timeout(Duration),

    #[error("reasoning response failed validation: {0}")]
    Malformed(String),

    #[error("reasoning confidence {reported:.2} below the configured floor {floor:.2}")]
    LowConfidence { reported: f64, floor: f64 },

    #[error("reasoning service error: {0}")]
    Upstream(String),
}

/// Result of a successful AI scoring pass.
#[derive(Debug)]
pub struct AiScore {
    pub candidates: Vec<MatchCandidate>,
    /// Concerns the reasoning service raised for the dispatcher.
    pub warnings: Vec<String>,
    /// Validation notes, e.g. dropped recommendations.
    pub notes: Vec<String>,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    needs: Vec<PromptNeed>,
    people_affected: Option<u32>,
    location: PromptLocation<'a>,
    urgency_score: f64,
}

#[derive(Serialize)]
struct PromptNeed {
    need_type: String,
    quantity: Option<u32>,
    confidence: f64,
}

#[derive(Serialize)]
struct PromptLocation<'a> {
    raw_text: &'a str,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Serialize)]
struct PromptResource<'a> {
    resource_id: &'a str,
    kind: String,
    name: &'a str,
    capabilities: Vec<String>,
    availability: String,
    remaining_capacity: u32,
    response_time_minutes: u32,
    distance_km: Option<f64>,
}

#[derive(Deserialize)]
struct ReasoningResponse {
    recommendations: Vec<Recommendation>,
    #[serde(default)]
    overall_confidence: Option<f64>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Deserialize)]
struct Recommendation {
    resource_id: String,
    final_score: f64,
    component_scores: RecommendedScores,
    #[serde(default)]
    reasoning: Vec<String>,
    #[serde(default)]
    trade_offs: Vec<String>,
    confidence: f64,
}

#[derive(Deserialize)]
struct RecommendedScores {
    suitability: f64,
    availability: f64,
    capacity: f64,
    distance: f64,
}

/// Scorer over an injected reasoning service.
pub struct AiScorer {
    reasoning: Arc<dyn BaseReasoning>,
    min_confidence: f64,
}

impl AiScorer {
    pub fn new(reasoning: Arc<dyn BaseReasoning>, min_confidence: f64) -> Self {
        Self {
            reasoning,
            min_confidence,
        }
    }

    /// Run one scoring pass. The caller applies the timeout; every other
    /// failure mode is mapped here.
    pub async fn score(
        &self,
        request: &NeedRequest,
        resources: &[Resource],
    ) -> Result<AiScore, ScorerFailure> {
        let prompt = self.build_prompt(request, resources)?;

        let raw = self
            .reasoning
            .complete(SYSTEM_DIRECTIVE, &prompt)
            .await
            .map_err(|e| ScorerFailure::Upstream(e.to_string()))?;

        self.validate(request, resources, &raw)
    }

    fn build_prompt(
        &self,
        request: &NeedRequest,
        resources: &[Resource],
    ) -> Result<String, ScorerFailure> {
        let request_payload = PromptRequest {
            needs: request
                .needs
                .iter()
                .map(|n| PromptNeed {
                    need_type: n.need_type.to_string(),
                    quantity: n.quantity,
                    confidence: n.confidence,
                })
                .collect(),
            people_affected: request.people_affected,
            location: PromptLocation {
                raw_text: &request.location.raw_text,
                latitude: request.location.point.map(|p| p.latitude),
                longitude: request.location.point.map(|p| p.longitude),
            },
            urgency_score: request.urgency_score,
        };

        let resource_payload: Vec<PromptResource<'_>> = resources
            .iter()
            .map(|r| PromptResource {
                resource_id: r.id.as_str(),
                kind: r.kind.to_string(),
                name: &r.name,
                capabilities: r.capabilities.iter().map(|c| c.to_string()).collect(),
                availability: r.availability.to_string(),
                remaining_capacity: r.remaining_capacity(),
                response_time_minutes: r.response_time_minutes,
                distance_km: request
                    .location
                    .point
                    .map(|p| distance_km(p, r.location)),
            })
            .collect();

        let request_json = serde_json::to_string_pretty(&request_payload)
            .map_err(|e| ScorerFailure::Malformed(format!("prompt serialization: {e}")))?;
        let resources_json = serde_json::to_string_pretty(&resource_payload)
            .map_err(|e| ScorerFailure::Malformed(format!("prompt serialization: {e}")))?;

        Ok(format!(
            "Rank the candidate resources for this emergency request.\n\n\
             Request:\n{request_json}\n\n\
             Candidate resources (the only resources you may recommend):\n{resources_json}"
        ))
    }

    fn validate(
        &self,
        request: &NeedRequest,
        resources: &[Resource],
        raw: &str,
    ) -> Result<AiScore, ScorerFailure> {
        let body = strip_code_fences(raw);
        let response: ReasoningResponse = serde_json::from_str(body)
            .map_err(|e| ScorerFailure::Malformed(format!("invalid JSON: {e}")))?;

        if let Some(reported) = response.overall_confidence {
            if reported < self.min_confidence {
                return Err(ScorerFailure::LowConfidence {
                    reported,
                    floor: self.min_confidence,
                });
            }
        }

        let mut notes = Vec::new();
        let mut candidates = Vec::new();

        for rec in response.recommendations {
            let resource_id = ResourceId::from(rec.resource_id.as_str());
            let Some(resource) = resources.iter().find(|r| r.id == resource_id) else {
                warn!(
                    request_id = %request.id,
                    resource_id = %resource_id,
                    "Dropping recommendation for a resource outside the candidate set"
                );
                notes.push(format!(
                    "Dropped recommendation for unknown resource {resource_id}"
                ));
                continue;
            };

            candidates.push(MatchCandidate {
                resource_id,
                resource_name: resource.name.clone(),
                scores: ComponentScores {
                    suitability: clamp01(rec.component_scores.suitability),
                    availability: clamp01(rec.component_scores.availability),
                    capacity: clamp01(rec.component_scores.capacity),
                    distance: clamp01(rec.component_scores.distance),
                },
                final_score: clamp01(rec.final_score),
                // Distances and arrival estimates are computed locally
                // rather than trusted from the response.
                distance_km: request
                    .location
                    .point
                    .map(|p| distance_km(p, resource.location)),
                estimated_arrival_minutes: request.location.point.map(|p| {
                    resource.estimated_arrival_minutes(distance_km(p, resource.location))
                }),
                reasoning: rec.reasoning,
                trade_offs: rec.trade_offs,
                confidence: ConfidenceLevel::from_score(clamp01(rec.confidence)),
                source: MatchSource::AiAssisted,
            });
        }

        if candidates.is_empty() {
            return Err(ScorerFailure::Malformed(
                "response contained no valid recommendations".to_string(),
            ));
        }

        candidates.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });

        debug!(
            request_id = %request.id,
            accepted = candidates.len(),
            dropped = notes.len(),
            "AI scoring response validated"
        );

        Ok(AiScore {
            candidates,
            warnings: response.warnings,
            notes,
        })
    }
}

/// Models often wrap JSON in markdown fences despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
