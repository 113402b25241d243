//! Append-only audit log.
//!
//! One immutable record per coordinator invocation and per lifecycle
//! transition. There is deliberately no update or delete surface; readers
//! get snapshot clones.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{DispatcherId, RequestId, ResourceId};
use crate::domains::requests::models::{MatchCandidate, MatchSource};

/// What an audit record describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AuditEntry {
    /// A coordinator invocation produced (or failed to produce) candidates.
    Decision {
        path: MatchSource,
        fallback_reason: Option<String>,
        candidates: Vec<MatchCandidate>,
        /// Validation notes, e.g. AI recommendations dropped for referencing
        /// unknown resources.
        notes: Vec<String>,
    },
    /// A lifecycle transition was applied.
    Transition {
        from: String,
        to: String,
        resource_id: Option<ResourceId>,
        dispatcher_id: Option<DispatcherId>,
        detail: Option<String>,
    },
}

/// A single immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub recorded_at: DateTime<Utc>,
    pub request_id: RequestId,
    pub entry: AuditEntry,
}

/// Append-only recorder shared across the engine.
pub struct AuditRecorder {
    records: Mutex<Vec<AuditRecord>>,
}

impl AuditRecorder {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Record a scoring decision, including empty candidate lists.
    pub fn record_decision(
        &self,
        request_id: RequestId,
        path: MatchSource,
        fallback_reason: Option<String>,
        candidates: Vec<MatchCandidate>,
        notes: Vec<String>,
    ) {
        self.append(AuditRecord {
            recorded_at: Utc::now(),
            request_id,
            entry: AuditEntry::Decision {
                path,
                fallback_reason,
                candidates,
                notes,
            },
        });
    }

    /// Record a lifecycle transition.
    pub fn record_transition(
        &self,
        request_id: RequestId,
        from: impl Into<String>,
        to: impl Into<String>,
        resource_id: Option<ResourceId>,
        dispatcher_id: Option<DispatcherId>,
        detail: Option<String>,
    ) {
        self.append(AuditRecord {
            recorded_at: Utc::now(),
            request_id,
            entry: AuditEntry::Transition {
                from: from.into(),
                to: to.into(),
                resource_id,
                dispatcher_id,
                detail,
            },
        });
    }

    fn append(&self, record: AuditRecord) {
        let mut records = self.records.lock().expect("audit lock poisoned");
        debug!(
            request_id = %record.request_id,
            total_records = records.len() + 1,
            "Audit record appended"
        );
        records.push(record);
    }

    /// Snapshot of the full log.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().expect("audit lock poisoned").clone()
    }

    /// Snapshot of records for one request.
    pub fn records_for(&self, request_id: RequestId) -> Vec<AuditRecord> {
        self.records
            .lock()
            .expect("audit lock poisoned")
            .iter()
            .filter(|r| r.request_id == request_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("audit lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new()
    }
}
