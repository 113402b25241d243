//! Engine facade wiring the registry, coordinator, lifecycle machine and
//! audit recorder together.

use std::sync::Arc;

use tracing::info;

use crate::common::{DispatcherId, EngineError, RequestId, ResourceId};
use crate::config::Config;
use crate::domains::audit::{AuditRecord, AuditRecorder};
use crate::domains::matching::{MatchCoordinator, MatchMode};
use crate::domains::requests::{NeedRequest, RequestDecision, RequestLifecycle, RequestState};
use crate::domains::resources::ResourceRegistry;
use crate::kernel::{BaseReasoning, ReasoningBridge};

/// Matching and dispatch orchestration engine.
///
/// One instance serves concurrent request tasks; the registry is the only
/// shared mutable state and all writes to it go through the lifecycle
/// machine.
pub struct TriageEngine {
    registry: Arc<ResourceRegistry>,
    coordinator: MatchCoordinator,
    lifecycle: RequestLifecycle,
    audit: Arc<AuditRecorder>,
}

impl TriageEngine {
    /// Build an engine from validated configuration. The reasoning client is
    /// constructed from the configured base URL when one is present.
    pub fn new(config: Config, registry: Arc<ResourceRegistry>) -> Result<Self, EngineError> {
        let reasoning = ReasoningBridge::from_config(&config)
            .map(|bridge| Arc::new(bridge) as Arc<dyn BaseReasoning>);
        Self::with_reasoning(config, registry, reasoning)
    }

    /// Build an engine with an injected reasoning service (tests, or a
    /// non-HTTP deployment).
    pub fn with_reasoning(
        config: Config,
        registry: Arc<ResourceRegistry>,
        reasoning: Option<Arc<dyn BaseReasoning>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let audit = Arc::new(AuditRecorder::new());
        let coordinator = MatchCoordinator::new(config, reasoning, audit.clone());
        let lifecycle = RequestLifecycle::new(registry.clone(), audit.clone());

        info!(resources = registry.len(), "Triage engine initialized");

        Ok(Self {
            registry,
            coordinator,
            lifecycle,
            audit,
        })
    }

    /// Run one request through intake, candidate selection and scoring,
    /// leaving it in `processing` awaiting human confirmation.
    ///
    /// An empty candidate set keeps the request `pending`, flags it for
    /// manual follow-up and fails with `NoCandidates`; the audit record for
    /// the empty decision is still written.
    pub async fn process(
        &self,
        request: NeedRequest,
        mode: MatchMode,
    ) -> Result<RequestDecision, EngineError> {
        let needs = request.need_types();
        self.lifecycle.intake(request.clone());

        let candidates = self.registry.candidates(&needs, false);
        let decision = self.coordinator.match_request(&request, &candidates, mode).await;

        self.lifecycle.begin_processing(decision.clone())?;
        Ok(decision)
    }

    /// Human confirmation of one candidate: commits capacity and moves the
    /// request to `dispatched`.
    pub fn confirm(
        &self,
        request_id: RequestId,
        resource_id: &ResourceId,
        dispatcher_id: DispatcherId,
        notes: Option<String>,
    ) -> Result<RequestDecision, EngineError> {
        self.lifecycle
            .confirm(request_id, resource_id, dispatcher_id, notes)
    }

    /// Human decline: moves the request to `cancelled`. Idempotent.
    pub fn cancel(
        &self,
        request_id: RequestId,
        dispatcher_id: DispatcherId,
        notes: Option<String>,
    ) -> Result<(), EngineError> {
        self.lifecycle.cancel(request_id, dispatcher_id, notes)
    }

    pub fn state(&self, request_id: RequestId) -> Option<RequestState> {
        self.lifecycle.state(request_id)
    }

    pub fn decision(&self, request_id: RequestId) -> Option<RequestDecision> {
        self.lifecycle.decision(request_id)
    }

    pub fn is_flagged_for_manual(&self, request_id: RequestId) -> bool {
        self.lifecycle.is_flagged_for_manual(request_id)
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Snapshot of the audit log for a request.
    pub fn audit_trail(&self, request_id: RequestId) -> Vec<AuditRecord> {
        self.audit.records_for(request_id)
    }
}
