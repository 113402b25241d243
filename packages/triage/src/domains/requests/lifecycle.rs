//! Request lifecycle state machine.
//!
//! `pending → processing → {dispatched | cancelled}`. This machine is the
//! single authority allowed to mark a resource committed, and it does so
//! only for a resource present in the request's current decision, only on
//! the `processing → dispatched` transition, and only after re-validating
//! against the live registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::{DispatcherId, EngineError, RequestId, ResourceId};
use crate::domains::audit::AuditRecorder;
use crate::domains::resources::ResourceRegistry;

use super::models::{HumanOutcome, NeedRequest, RequestDecision, Resolution};

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Processing,
    Dispatched,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Dispatched | RequestState::Cancelled)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Pending => write!(f, "pending"),
            RequestState::Processing => write!(f, "processing"),
            RequestState::Dispatched => write!(f, "dispatched"),
            RequestState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A request tracked by the lifecycle machine.
#[derive(Debug, Clone)]
struct TrackedRequest {
    request: NeedRequest,
    state: RequestState,
    decision: Option<RequestDecision>,
    /// Set when matching produced no candidates; the request needs manual
    /// follow-up.
    flagged_for_manual: bool,
}

/// Lifecycle machine over all in-flight requests.
pub struct RequestLifecycle {
    registry: Arc<ResourceRegistry>,
    audit: Arc<AuditRecorder>,
    requests: Mutex<HashMap<RequestId, TrackedRequest>>,
}

impl RequestLifecycle {
    pub fn new(registry: Arc<ResourceRegistry>, audit: Arc<AuditRecorder>) -> Self {
        Self {
            registry,
            audit,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new request in `pending`.
    pub fn intake(&self, request: NeedRequest) {
        let mut requests = self.requests.lock().expect("lifecycle lock poisoned");
        info!(request_id = %request.id, "Request received, state pending");
        requests.insert(
            request.id,
            TrackedRequest {
                request,
                state: RequestState::Pending,
                decision: None,
                flagged_for_manual: false,
            },
        );
    }

    /// `pending → processing`, attaching the decision produced by the
    /// coordinator.
    ///
    /// A decision with no candidates leaves the request `pending`, flags it
    /// for manual intervention and fails with `NoCandidates`. The decision
    /// audit entry has already been written by the coordinator.
    pub fn begin_processing(&self, decision: RequestDecision) -> Result<(), EngineError> {
        let request_id = decision.request_id;
        let mut requests = self.requests.lock().expect("lifecycle lock poisoned");
        let tracked = requests
            .get_mut(&request_id)
            .ok_or(EngineError::UnknownRequest { request_id })?;

        if tracked.state != RequestState::Pending {
            return Err(EngineError::InvalidStateTransition {
                request_id,
                current_state: tracked.state.to_string(),
                attempted: "begin_processing".to_string(),
            });
        }

        if decision.candidates.is_empty() {
            warn!(
                request_id = %request_id,
                "No eligible candidates, request stays pending and is flagged for manual follow-up"
            );
            tracked.flagged_for_manual = true;
            return Err(EngineError::NoCandidates { request_id });
        }

        info!(
            request_id = %request_id,
            candidates = decision.candidates.len(),
            path = %decision.path,
            "Decision attached, state processing"
        );
        tracked.decision = Some(decision);
        tracked.state = RequestState::Processing;
        self.audit.record_transition(
            request_id,
            RequestState::Pending.to_string(),
            RequestState::Processing.to_string(),
            None,
            None,
            None,
        );
        Ok(())
    }

    /// `processing → dispatched`: human confirmation of one candidate.
    ///
    /// The selected resource must be in the current decision's candidate
    /// list and still eligible against the live registry. The commit intent
    /// is applied atomically; losing a commit race surfaces
    /// `ResourceNoLongerAvailable` and the request stays `processing`.
    pub fn confirm(
        &self,
        request_id: RequestId,
        resource_id: &ResourceId,
        dispatcher_id: DispatcherId,
        notes: Option<String>,
    ) -> Result<RequestDecision, EngineError> {
        let mut requests = self.requests.lock().expect("lifecycle lock poisoned");
        let tracked = requests
            .get_mut(&request_id)
            .ok_or(EngineError::UnknownRequest { request_id })?;

        if tracked.state != RequestState::Processing {
            return Err(EngineError::InvalidStateTransition {
                request_id,
                current_state: tracked.state.to_string(),
                attempted: format!("confirm({resource_id})"),
            });
        }

        let decision = tracked
            .decision
            .as_mut()
            .expect("processing request always has a decision");

        if !decision.contains(resource_id) {
            warn!(
                request_id = %request_id,
                resource_id = %resource_id,
                "Confirmation referenced a resource outside the candidate list"
            );
            return Err(EngineError::ResourceNoLongerAvailable {
                request_id,
                resource_id: resource_id.clone(),
                reason: "not in the current decision's candidate list".to_string(),
            });
        }

        // Re-validate against the live registry: availability may have
        // changed since scoring, and a racing confirm may have consumed the
        // remaining capacity.
        let delta = tracked.request.people_affected.unwrap_or(1);
        if let Err(conflict) = self.registry.commit(resource_id, delta) {
            warn!(
                request_id = %request_id,
                resource_id = %resource_id,
                conflict = %conflict,
                "Commit intent rejected, request stays processing"
            );
            return Err(EngineError::ResourceNoLongerAvailable {
                request_id,
                resource_id: resource_id.clone(),
                reason: conflict.to_string(),
            });
        }

        let recommended = decision.top_candidate().map(|c| c.resource_id.clone());
        let overrode_recommendation = match recommended {
            Some(top) if &top != resource_id => {
                info!(
                    request_id = %request_id,
                    recommended = %top,
                    selected = %resource_id,
                    "Dispatcher override recorded"
                );
                Some(top)
            }
            _ => None,
        };

        decision.resolution = Some(Resolution {
            outcome: HumanOutcome::Dispatched {
                resource_id: resource_id.clone(),
                overrode_recommendation,
            },
            dispatcher_id: dispatcher_id.clone(),
            notes: notes.clone(),
            resolved_at: Utc::now(),
        });
        tracked.state = RequestState::Dispatched;

        info!(
            request_id = %request_id,
            resource_id = %resource_id,
            dispatcher_id = %dispatcher_id,
            "Dispatch confirmed"
        );
        self.audit.record_transition(
            request_id,
            RequestState::Processing.to_string(),
            RequestState::Dispatched.to_string(),
            Some(resource_id.clone()),
            Some(dispatcher_id),
            notes,
        );

        Ok(decision.clone())
    }

    /// `processing → cancelled`: human declines. Idempotent on an already
    /// cancelled request (no duplicate audit record).
    pub fn cancel(
        &self,
        request_id: RequestId,
        dispatcher_id: DispatcherId,
        notes: Option<String>,
    ) -> Result<(), EngineError> {
        let mut requests = self.requests.lock().expect("lifecycle lock poisoned");
        let tracked = requests
            .get_mut(&request_id)
            .ok_or(EngineError::UnknownRequest { request_id })?;

        match tracked.state {
            RequestState::Cancelled => Ok(()),
            RequestState::Processing => {
                if let Some(decision) = tracked.decision.as_mut() {
                    decision.resolution = Some(Resolution {
                        outcome: HumanOutcome::Cancelled,
                        dispatcher_id: dispatcher_id.clone(),
                        notes: notes.clone(),
                        resolved_at: Utc::now(),
                    });
                }
                tracked.state = RequestState::Cancelled;
                info!(request_id = %request_id, dispatcher_id = %dispatcher_id, "Request cancelled");
                self.audit.record_transition(
                    request_id,
                    RequestState::Processing.to_string(),
                    RequestState::Cancelled.to_string(),
                    None,
                    Some(dispatcher_id),
                    notes,
                );
                Ok(())
            }
            state => Err(EngineError::InvalidStateTransition {
                request_id,
                current_state: state.to_string(),
                attempted: "cancel".to_string(),
            }),
        }
    }

    /// Current lifecycle state of a request.
    pub fn state(&self, request_id: RequestId) -> Option<RequestState> {
        let requests = self.requests.lock().expect("lifecycle lock poisoned");
        requests.get(&request_id).map(|t| t.state)
    }

    /// Snapshot of the current decision, if one exists.
    pub fn decision(&self, request_id: RequestId) -> Option<RequestDecision> {
        let requests = self.requests.lock().expect("lifecycle lock poisoned");
        requests.get(&request_id).and_then(|t| t.decision.clone())
    }

    /// Whether the request is waiting on manual follow-up after an empty
    /// candidate set.
    pub fn is_flagged_for_manual(&self, request_id: RequestId) -> bool {
        let requests = self.requests.lock().expect("lifecycle lock poisoned");
        requests
            .get(&request_id)
            .map(|t| t.flagged_for_manual)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ConfidenceLevel, GeoPoint, NeedType};
    use crate::domains::requests::models::{
        ComponentScores, ExtractedNeed, MatchCandidate, MatchSource, RequestLocation,
    };
    use crate::domains::resources::{Availability, Resource, ResourceKind};

    fn medical_request(people: u32) -> NeedRequest {
        NeedRequest::new(
            vec![ExtractedNeed::new(NeedType::MedicalAid, 0.92)],
            RequestLocation::unresolved("5th and Main"),
        )
        .with_people_affected(people)
    }

    fn candidate(id: &str, score: f64) -> MatchCandidate {
        MatchCandidate {
            resource_id: ResourceId::from(id),
            resource_name: format!("Unit {id}"),
            scores: ComponentScores {
                suitability: 1.0,
                availability: 1.0,
                capacity: 1.0,
                distance: 0.5,
            },
            final_score: score,
            distance_km: None,
            estimated_arrival_minutes: None,
            reasoning: vec![],
            trade_offs: vec![],
            confidence: ConfidenceLevel::High,
            source: MatchSource::RuleBased,
        }
    }

    fn decision_for(request: &NeedRequest, ids: &[(&str, f64)]) -> RequestDecision {
        RequestDecision::new(
            request.id,
            ids.iter().map(|(id, s)| candidate(id, *s)).collect(),
            MatchSource::RuleBased,
            None,
            vec![],
        )
    }

    fn registry_with(ids: &[&str]) -> Arc<ResourceRegistry> {
        Arc::new(ResourceRegistry::with_resources(ids.iter().map(|id| {
            Resource::new(
                *id,
                ResourceKind::Ambulance,
                format!("Unit {id}"),
                GeoPoint::new(40.7, -74.0),
                6,
            )
            .with_capabilities([NeedType::MedicalAid])
        })))
    }

    fn lifecycle(registry: Arc<ResourceRegistry>) -> RequestLifecycle {
        RequestLifecycle::new(registry, Arc::new(AuditRecorder::new()))
    }

    #[test]
    fn happy_path_reaches_dispatched_and_commits_capacity() {
        let registry = registry_with(&["unit-001"]);
        let machine = lifecycle(registry.clone());
        let request = medical_request(5);
        let request_id = request.id;

        machine.intake(request.clone());
        machine
            .begin_processing(decision_for(&request, &[("unit-001", 0.95)]))
            .unwrap();
        assert_eq!(machine.state(request_id), Some(RequestState::Processing));

        let resolved = machine
            .confirm(
                request_id,
                &ResourceId::from("unit-001"),
                DispatcherId::new("dispatcher-7"),
                Some("confirmed by radio".to_string()),
            )
            .unwrap();

        assert_eq!(machine.state(request_id), Some(RequestState::Dispatched));
        assert!(resolved.is_resolved());
        let committed = registry.get(&ResourceId::from("unit-001")).unwrap();
        assert_eq!(committed.committed, 5);
    }

    #[test]
    fn empty_decision_keeps_request_pending_and_flags_it() {
        let machine = lifecycle(registry_with(&[]));
        let request = medical_request(2);
        let request_id = request.id;

        machine.intake(request.clone());
        let err = machine
            .begin_processing(decision_for(&request, &[]))
            .unwrap_err();

        assert!(matches!(err, EngineError::NoCandidates { .. }));
        assert_eq!(machine.state(request_id), Some(RequestState::Pending));
        assert!(machine.is_flagged_for_manual(request_id));
    }

    #[test]
    fn confirming_a_resource_outside_the_decision_fails_and_preserves_state() {
        let registry = registry_with(&["unit-001", "unit-099"]);
        let machine = lifecycle(registry.clone());
        let request = medical_request(1);
        let request_id = request.id;

        machine.intake(request.clone());
        machine
            .begin_processing(decision_for(&request, &[("unit-001", 0.9)]))
            .unwrap();

        let err = machine
            .confirm(
                request_id,
                &ResourceId::from("unit-099"),
                DispatcherId::new("dispatcher-1"),
                None,
            )
            .unwrap_err();

        assert!(matches!(err, EngineError::ResourceNoLongerAvailable { .. }));
        assert_eq!(machine.state(request_id), Some(RequestState::Processing));
        assert_eq!(registry.get(&ResourceId::from("unit-099")).unwrap().committed, 0);
    }

    #[test]
    fn stale_confirmation_fails_when_availability_flipped() {
        let registry = registry_with(&["unit-001"]);
        let machine = lifecycle(registry.clone());
        let request = medical_request(2);
        let request_id = request.id;

        machine.intake(request.clone());
        machine
            .begin_processing(decision_for(&request, &[("unit-001", 0.9)]))
            .unwrap();

        // Availability changes between scoring and confirmation.
        let mut stale = registry.get(&ResourceId::from("unit-001")).unwrap();
        stale.availability = Availability::Unavailable;
        registry.upsert(stale);

        let err = machine
            .confirm(
                request_id,
                &ResourceId::from("unit-001"),
                DispatcherId::new("dispatcher-1"),
                None,
            )
            .unwrap_err();

        assert!(matches!(err, EngineError::ResourceNoLongerAvailable { .. }));
        assert_eq!(machine.state(request_id), Some(RequestState::Processing));
    }

    #[test]
    fn racing_confirms_over_the_same_resource_lose_at_commit_time() {
        let registry = registry_with(&["unit-001"]);
        let machine = lifecycle(registry.clone());

        let first = medical_request(6);
        let second = medical_request(4);
        machine.intake(first.clone());
        machine.intake(second.clone());
        machine
            .begin_processing(decision_for(&first, &[("unit-001", 0.9)]))
            .unwrap();
        machine
            .begin_processing(decision_for(&second, &[("unit-001", 0.9)]))
            .unwrap();

        machine
            .confirm(
                first.id,
                &ResourceId::from("unit-001"),
                DispatcherId::new("dispatcher-1"),
                None,
            )
            .unwrap();

        // Capacity 6 fully committed: nothing remains for the second.
        let err = machine
            .confirm(
                second.id,
                &ResourceId::from("unit-001"),
                DispatcherId::new("dispatcher-2"),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ResourceNoLongerAvailable { .. }));
        assert_eq!(machine.state(second.id), Some(RequestState::Processing));
    }

    #[test]
    fn partial_capacity_candidate_commits_what_remains() {
        let registry = Arc::new(ResourceRegistry::with_resources([Resource::new(
            "unit-001",
            ResourceKind::Ambulance,
            "Unit unit-001",
            GeoPoint::new(40.7, -74.0),
            3,
        )
        .with_capabilities([NeedType::MedicalAid])]));
        let machine = lifecycle(registry.clone());
        let request = medical_request(5);
        let request_id = request.id;

        machine.intake(request.clone());
        machine
            .begin_processing(decision_for(&request, &[("unit-001", 0.8)]))
            .unwrap();

        // Nothing changed since scoring: the undersized candidate the
        // engine itself recommended must still be confirmable.
        machine
            .confirm(
                request_id,
                &ResourceId::from("unit-001"),
                DispatcherId::new("dispatcher-1"),
                None,
            )
            .unwrap();

        assert_eq!(machine.state(request_id), Some(RequestState::Dispatched));
        let committed = registry.get(&ResourceId::from("unit-001")).unwrap();
        assert_eq!(committed.committed, 3);
        assert_eq!(committed.availability, Availability::Deployed);
    }

    #[test]
    fn terminal_states_reject_further_confirmation() {
        let registry = registry_with(&["unit-001"]);
        let machine = lifecycle(registry);
        let request = medical_request(1);
        let request_id = request.id;

        machine.intake(request.clone());
        machine
            .begin_processing(decision_for(&request, &[("unit-001", 0.9)]))
            .unwrap();
        machine
            .confirm(
                request_id,
                &ResourceId::from("unit-001"),
                DispatcherId::new("dispatcher-1"),
                None,
            )
            .unwrap();

        let err = machine
            .confirm(
                request_id,
                &ResourceId::from("unit-001"),
                DispatcherId::new("dispatcher-1"),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidStateTransition { .. }));
    }

    #[test]
    fn cancel_is_idempotent_without_duplicate_audit_records() {
        let registry = registry_with(&["unit-001"]);
        let audit = Arc::new(AuditRecorder::new());
        let machine = RequestLifecycle::new(registry, audit.clone());
        let request = medical_request(1);
        let request_id = request.id;

        machine.intake(request.clone());
        machine
            .begin_processing(decision_for(&request, &[("unit-001", 0.9)]))
            .unwrap();

        machine
            .cancel(request_id, DispatcherId::new("dispatcher-1"), None)
            .unwrap();
        let records_after_first = audit.records_for(request_id).len();

        machine
            .cancel(request_id, DispatcherId::new("dispatcher-1"), None)
            .unwrap();
        assert_eq!(audit.records_for(request_id).len(), records_after_first);
        assert_eq!(machine.state(request_id), Some(RequestState::Cancelled));
    }

    #[test]
    fn cancelling_a_pending_request_is_invalid() {
        let machine = lifecycle(registry_with(&[]));
        let request = medical_request(1);
        let request_id = request.id;
        machine.intake(request);

        let err = machine
            .cancel(request_id, DispatcherId::new("dispatcher-1"), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidStateTransition { .. }));
    }
}
