//! Matching coordinator.
//!
//! Chooses between the AI-assisted and rule-based scoring paths, bounds the
//! only suspending call with a timeout, and guarantees a decision comes back
//! whenever the candidate set is non-empty. Never touches lifecycle state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::domains::audit::AuditRecorder;
use crate::domains::requests::models::{MatchSource, NeedRequest, RequestDecision};
use crate::domains::resources::models::Resource;
use crate::kernel::BaseReasoning;

use super::ai_scorer::{AiScorer, ScorerFailure};
use super::scorer::score_resources;
use super::MatchMode;

/// Extraction confidence below which a warning is attached for the
/// dispatcher.
const LOW_EXTRACTION_WARNING_THRESHOLD: f64 = 0.7;
/// Top final score below which the match is flagged as weak.
const WEAK_MATCH_THRESHOLD: f64 = 0.5;

/// Urgency at or above which arrival time is checked.
const CRITICAL_URGENCY_THRESHOLD: f64 = 0.8;
/// Arrival estimate beyond which a critical-urgency request is flagged.
const CRITICAL_ARRIVAL_MINUTES: u32 = 30;

/// Coordinates scoring-path selection and fallback.
pub struct MatchCoordinator {
    config: Config,
    reasoning: Option<Arc<dyn BaseReasoning>>,
    audit: Arc<AuditRecorder>,
}

impl MatchCoordinator {
    pub fn new(
        config: Config,
        reasoning: Option<Arc<dyn BaseReasoning>>,
        audit: Arc<AuditRecorder>,
    ) -> Self {
        Self {
            config,
            reasoning,
            audit,
        }
    }

    /// Produce a decision for the request over the supplied candidate
    /// snapshot.
    ///
    /// AI-path failures never escape: any `ScorerFailure` (including
    /// timeout) falls back to the deterministic scorer with the reason
    /// recorded on the decision and in the audit log. An empty candidate
    /// list still produces a decision and an audit record; rejecting it is
    /// the lifecycle machine's job.
    pub async fn match_request(
        &self,
        request: &NeedRequest,
        candidates: &[Resource],
        mode: MatchMode,
    ) -> RequestDecision {
        let (decision, notes) = self.decide(request, candidates, mode).await;

        self.audit.record_decision(
            request.id,
            decision.path,
            decision.fallback_reason.clone(),
            decision.candidates.clone(),
            notes,
        );

        info!(
            request_id = %request.id,
            path = %decision.path,
            candidates = decision.candidates.len(),
            fallback = decision.fallback_reason.is_some(),
            "Match decision produced"
        );

        decision
    }

    async fn decide(
        &self,
        request: &NeedRequest,
        candidates: &[Resource],
        mode: MatchMode,
    ) -> (RequestDecision, Vec<String>) {
        if let Some(reason) = self.rule_path_policy(request, mode) {
            info!(request_id = %request.id, reason, "Rule-based path selected by policy");
            return (self.rule_decision(request, candidates, None), vec![]);
        }
        let Some(reasoning) = self.reasoning.clone() else {
            // The policy above only passes when a client is configured.
            return (self.rule_decision(request, candidates, None), vec![]);
        };

        match self.attempt_ai(reasoning, request, candidates).await {
            Ok(score) => {
                let mut warnings = score.warnings;
                let mut decision = RequestDecision::new(
                    request.id,
                    score.candidates,
                    MatchSource::AiAssisted,
                    None,
                    vec![],
                );
                warnings.extend(base_warnings(request, &decision.candidates));
                decision.warnings = warnings;
                (decision, score.notes)
            }
            Err(failure) => {
                warn!(
                    request_id = %request.id,
                    failure = %failure,
                    "AI path failed, falling back to rule-based scoring"
                );
                (
                    self.rule_decision(request, candidates, Some(failure.to_string())),
                    vec![],
                )
            }
        }
    }

    /// Why the rule path is chosen without attempting AI, if it is.
    /// Policy choices are not fallbacks and carry no fallback reason.
    fn rule_path_policy(&self, request: &NeedRequest, mode: MatchMode) -> Option<&'static str> {
        match mode {
            MatchMode::ForcedRule => Some("rule path forced"),
            // Forced AI overrides the confidence floor only; the enable
            // flag disables the AI path for every mode.
            MatchMode::ForcedAi => {
                if !self.config.enable_ai_matching {
                    Some("AI matching disabled")
                } else if self.reasoning.is_none() {
                    Some("no reasoning service configured")
                } else {
                    None
                }
            }
            MatchMode::Auto => {
                if !self.config.enable_ai_matching {
                    Some("AI matching disabled")
                } else if self.reasoning.is_none() {
                    Some("no reasoning service configured")
                } else if request.extraction_confidence < self.config.ai_min_confidence {
                    Some("extraction confidence below the AI floor")
                } else {
                    None
                }
            }
        }
    }

    async fn attempt_ai(
        &self,
        reasoning: Arc<dyn BaseReasoning>,
        request: &NeedRequest,
        candidates: &[Resource],
    ) -> Result<super::ai_scorer::AiScore, ScorerFailure> {
        let scorer = AiScorer::new(reasoning, self.config.ai_min_confidence);
        let deadline = self.config.reasoning_timeout;

        // Dropping the future on timeout cancels the in-flight call.
        tokio::time::timeout(deadline, scorer.score(request, candidates))
            .await
            .map_err(|_| ScorerFailure::Timeout(deadline))?
    }

    fn rule_decision(
        &self,
        request: &NeedRequest,
        candidates: &[Resource],
        fallback_reason: Option<String>,
    ) -> RequestDecision {
        let scored = score_resources(request, candidates, &self.config.weights);
        let warnings = base_warnings(request, &scored);
        RequestDecision::new(
            request.id,
            scored,
            MatchSource::RuleBased,
            fallback_reason,
            warnings,
        )
    }
}

/// Warnings the dispatcher should see regardless of scoring path.
fn base_warnings(
    request: &NeedRequest,
    candidates: &[crate::domains::requests::models::MatchCandidate],
) -> Vec<String> {
    let mut warnings = Vec::new();

    if request.extraction_confidence < LOW_EXTRACTION_WARNING_THRESHOLD {
        warnings.push(format!(
            "Low extraction confidence ({:.2}); verify the reported needs before dispatch",
            request.extraction_confidence
        ));
    }
    if !request.location.is_resolved() {
        warnings.push(format!(
            "Location could not be resolved from \"{}\"; distances are assumed",
            request.location.raw_text
        ));
    }
    match candidates.first() {
        None => warnings.push("No eligible resources matched this request".to_string()),
        Some(top) if top.final_score < WEAK_MATCH_THRESHOLD => warnings.push(format!(
            "Best available match scores only {:.2}; consider manual alternatives",
            top.final_score
        )),
        Some(_) => {}
    }
    if request.urgency_score >= CRITICAL_URGENCY_THRESHOLD {
        if let Some(eta) = candidates.first().and_then(|c| c.estimated_arrival_minutes) {
            if eta > CRITICAL_ARRIVAL_MINUTES {
                warnings.push(format!(
                    "Critical urgency but the best match is an estimated {eta} minutes out"
                ));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::common::{GeoPoint, NeedType};
    use crate::domains::requests::models::{ExtractedNeed, RequestLocation};
    use crate::domains::resources::models::{Resource, ResourceKind};
    use crate::kernel::MockReasoning;

    fn medical_request() -> NeedRequest {
        NeedRequest::new(
            vec![ExtractedNeed::new(NeedType::MedicalAid, 0.92)],
            RequestLocation::resolved("downtown", GeoPoint::new(40.7128, -74.0060), 0.9),
        )
        .with_people_affected(5)
    }

    fn ambulance(id: &str) -> Resource {
        Resource::new(
            id,
            ResourceKind::Ambulance,
            format!("Ambulance {id}"),
            GeoPoint::new(40.7128, -74.0060),
            6,
        )
        .with_capabilities([NeedType::MedicalAid])
    }

    fn ai_config() -> Config {
        Config {
            enable_ai_matching: true,
            reasoning_base_url: Some("http://localhost:9999".to_string()),
            reasoning_timeout: Duration::from_millis(100),
            ..Config::default()
        }
    }

    fn valid_ai_response(resource_id: &str) -> String {
        format!(
            r#"{{
                "recommendations": [{{
                    "resource_id": "{resource_id}",
                    "final_score": 0.93,
                    "component_scores": {{
                        "suitability": 1.0,
                        "availability": 1.0,
                        "capacity": 0.9,
                        "distance": 0.8
                    }},
                    "reasoning": ["equipped for medical response"],
                    "trade_offs": [],
                    "confidence": 0.9
                }}],
                "overall_confidence": 0.88,
                "warnings": ["single candidate only"]
            }}"#
        )
    }

    fn coordinator(
        config: Config,
        reasoning: Option<Arc<dyn BaseReasoning>>,
    ) -> (MatchCoordinator, Arc<AuditRecorder>) {
        let audit = Arc::new(AuditRecorder::new());
        (
            MatchCoordinator::new(config, reasoning, audit.clone()),
            audit,
        )
    }

    #[tokio::test]
    async fn disabled_ai_uses_rule_path_without_fallback_reason() {
        let (coordinator, audit) = coordinator(Config::default(), None);
        let request = medical_request();

        let decision = coordinator
            .match_request(&request, &[ambulance("unit-001")], MatchMode::Auto)
            .await;

        assert_eq!(decision.path, MatchSource::RuleBased);
        assert_eq!(decision.fallback_reason, None);
        assert!(decision.human_action_required);
        assert_eq!(audit.records_for(request.id).len(), 1);
    }

    #[tokio::test]
    async fn ai_path_is_used_when_enabled_and_confident() {
        let mock = Arc::new(MockReasoning::new().with_response(valid_ai_response("unit-001")));
        let (coordinator, _) = coordinator(ai_config(), Some(mock.clone()));

        let decision = coordinator
            .match_request(&medical_request(), &[ambulance("unit-001")], MatchMode::Auto)
            .await;

        assert_eq!(decision.path, MatchSource::AiAssisted);
        assert_eq!(decision.fallback_reason, None);
        assert!(decision.warnings.iter().any(|w| w == "single candidate only"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn low_extraction_confidence_skips_the_ai_call_entirely() {
        let mock = Arc::new(MockReasoning::new().with_response(valid_ai_response("unit-001")));
        let (coordinator, _) = coordinator(ai_config(), Some(mock.clone()));
        let request = medical_request().with_extraction_confidence(0.4);

        let decision = coordinator
            .match_request(&request, &[ambulance("unit-001")], MatchMode::Auto)
            .await;

        assert_eq!(decision.path, MatchSource::RuleBased);
        assert_eq!(decision.fallback_reason, None);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn extraction_confidence_at_the_floor_attempts_ai() {
        let mock = Arc::new(MockReasoning::new().with_response(valid_ai_response("unit-001")));
        let config = ai_config();
        let floor = config.ai_min_confidence;
        let (coordinator, _) = coordinator(config, Some(mock.clone()));
        let request = medical_request().with_extraction_confidence(floor);

        coordinator
            .match_request(&request, &[ambulance("unit-001")], MatchMode::Auto)
            .await;
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn ai_timeout_falls_back_to_an_identical_rule_decision() {
        let hang = Arc::new(MockReasoning::new().with_hang());
        let (with_ai, _) = coordinator(ai_config(), Some(hang));
        let (rule_only, _) = coordinator(Config::default(), None);
        let request = medical_request();
        let candidates = [ambulance("unit-001"), ambulance("unit-002")];

        let fallen_back = with_ai
            .match_request(&request, &candidates, MatchMode::Auto)
            .await;
        let pure_rule = rule_only
            .match_request(&request, &candidates, MatchMode::Auto)
            .await;

        assert_eq!(fallen_back.path, MatchSource::RuleBased);
        assert!(fallen_back
            .fallback_reason
            .as_deref()
            .unwrap()
            .contains("deadline"));

        let fallen_ids: Vec<_> = fallen_back
            .candidates
            .iter()
            .map(|c| (c.resource_id.clone(), c.final_score))
            .collect();
        let rule_ids: Vec<_> = pure_rule
            .candidates
            .iter()
            .map(|c| (c.resource_id.clone(), c.final_score))
            .collect();
        assert_eq!(fallen_ids, rule_ids);
    }

    #[tokio::test]
    async fn malformed_ai_output_falls_back() {
        let mock = Arc::new(MockReasoning::new().with_response("not json at all"));
        let (coordinator, audit) = coordinator(ai_config(), Some(mock));
        let request = medical_request();

        let decision = coordinator
            .match_request(&request, &[ambulance("unit-001")], MatchMode::Auto)
            .await;

        assert_eq!(decision.path, MatchSource::RuleBased);
        assert!(decision.fallback_reason.is_some());
        // One audit record for the invocation, carrying the fallback reason.
        assert_eq!(audit.records_for(request.id).len(), 1);
    }

    #[tokio::test]
    async fn forced_ai_still_falls_back_on_hard_failure() {
        let mock = Arc::new(MockReasoning::new().with_failure("service unavailable"));
        let (coordinator, _) = coordinator(ai_config(), Some(mock));

        let decision = coordinator
            .match_request(&medical_request(), &[ambulance("unit-001")], MatchMode::ForcedAi)
            .await;

        assert_eq!(decision.path, MatchSource::RuleBased);
        assert!(!decision.candidates.is_empty());
        assert!(decision.fallback_reason.is_some());
    }

    #[tokio::test]
    async fn forced_rule_never_calls_the_reasoning_service() {
        let mock = Arc::new(MockReasoning::new().with_response(valid_ai_response("unit-001")));
        let (coordinator, _) = coordinator(ai_config(), Some(mock.clone()));

        let decision = coordinator
            .match_request(
                &medical_request(),
                &[ambulance("unit-001")],
                MatchMode::ForcedRule,
            )
            .await;

        assert_eq!(decision.path, MatchSource::RuleBased);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn forced_ai_respects_the_disabled_flag() {
        let mock = Arc::new(MockReasoning::new().with_response(valid_ai_response("unit-001")));
        let config = Config {
            enable_ai_matching: false,
            reasoning_base_url: Some("http://localhost:9999".to_string()),
            ..Config::default()
        };
        let (coordinator, _) = coordinator(config, Some(mock.clone()));

        let decision = coordinator
            .match_request(&medical_request(), &[ambulance("unit-001")], MatchMode::ForcedAi)
            .await;

        assert_eq!(decision.path, MatchSource::RuleBased);
        assert_eq!(decision.fallback_reason, None);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn critical_urgency_with_distant_best_match_is_warned() {
        let (coordinator, _) = coordinator(Config::default(), None);
        let request = medical_request().with_urgency(0.9);
        // ~40 km north: 60 minutes of travel plus mobilization.
        let distant = Resource::new(
            "unit-far",
            ResourceKind::Ambulance,
            "Distant Ambulance",
            GeoPoint::new(41.0728, -74.0060),
            6,
        )
        .with_capabilities([NeedType::MedicalAid]);

        let decision = coordinator
            .match_request(&request, &[distant], MatchMode::Auto)
            .await;

        assert!(decision
            .warnings
            .iter()
            .any(|w| w.contains("Critical urgency")));
    }

    #[tokio::test]
    async fn critical_urgency_with_a_nearby_match_is_not_warned() {
        let (coordinator, _) = coordinator(Config::default(), None);
        let request = medical_request().with_urgency(0.9);

        let decision = coordinator
            .match_request(&request, &[ambulance("unit-001")], MatchMode::Auto)
            .await;

        assert!(!decision
            .warnings
            .iter()
            .any(|w| w.contains("Critical urgency")));
    }

    #[tokio::test]
    async fn empty_candidate_set_still_produces_decision_and_audit_record() {
        let (coordinator, audit) = coordinator(Config::default(), None);
        let request = medical_request();

        let decision = coordinator.match_request(&request, &[], MatchMode::Auto).await;

        assert!(decision.candidates.is_empty());
        assert!(decision
            .warnings
            .iter()
            .any(|w| w.contains("No eligible resources")));
        assert_eq!(audit.records_for(request.id).len(), 1);
    }

    #[tokio::test]
    async fn unresolved_location_and_low_confidence_are_warned() {
        let (coordinator, _) = coordinator(Config::default(), None);
        let request = NeedRequest::new(
            vec![ExtractedNeed::new(NeedType::MedicalAid, 0.5)],
            RequestLocation::unresolved("somewhere east"),
        )
        .with_extraction_confidence(0.5);

        let decision = coordinator
            .match_request(&request, &[ambulance("unit-001")], MatchMode::Auto)
            .await;

        assert!(decision
            .warnings
            .iter()
            .any(|w| w.contains("Low extraction confidence")));
        assert!(decision
            .warnings
            .iter()
            .any(|w| w.contains("could not be resolved")));
    }
}
