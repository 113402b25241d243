//! In-memory registry accessor.
//!
//! The persistent store behind the registry is an external collaborator;
//! this type is the view the engine is allowed to use: lock-free
//! point-in-time snapshots for reads, and a per-resource compare-and-commit
//! for capacity changes. No global lock is held across scoring.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use thiserror::Error;
use tracing::{debug, info};

use crate::common::{NeedType, ResourceId};

use super::models::{Availability, Resource};

/// Why a commit intent was rejected.
#[derive(Debug, Clone, Error)]
pub enum CommitConflict {
    #[error("resource not found in registry")]
    NotFound,

    #[error("resource is not verified")]
    Unverified,

    #[error("resource availability is {0}")]
    Unavailable(Availability),

    #[error("no remaining capacity")]
    Exhausted,
}

/// Registry of responder resources.
pub struct ResourceRegistry {
    inner: RwLock<BTreeMap<ResourceId, Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let registry = Self::new();
        for resource in resources {
            registry.upsert(resource);
        }
        registry
    }

    /// Insert or replace a resource. Registry-owner surface, not used by the
    /// matching path.
    pub fn upsert(&self, resource: Resource) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.insert(resource.id.clone(), resource);
    }

    /// Point-in-time snapshot of a single resource.
    pub fn get(&self, id: &ResourceId) -> Option<Resource> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Eligible candidates for the given need types, ordered by resource id.
    ///
    /// Filters to verified resources that are not unavailable and service at
    /// least one of the requested needs. Fully committed resources are
    /// excluded unless `include_over_capacity` is set; over-capacity
    /// candidates are only ever used for trade-off exposition, never for
    /// selection. Side-effect-free.
    pub fn candidates(
        &self,
        needs: &BTreeSet<NeedType>,
        include_over_capacity: bool,
    ) -> Vec<Resource> {
        let inner = self.inner.read().expect("registry lock poisoned");

        let candidates: Vec<Resource> = inner
            .values()
            .filter(|r| r.is_eligible())
            .filter(|r| needs.is_empty() || needs.iter().any(|n| r.covers(*n)))
            .filter(|r| include_over_capacity || r.has_spare_capacity())
            .cloned()
            .collect();

        debug!(
            needs = needs.len(),
            eligible = candidates.len(),
            include_over_capacity,
            "Registry candidate snapshot taken"
        );

        candidates
    }

    /// Apply a commit intent atomically.
    ///
    /// Succeeds only if the resource still satisfies the availability
    /// constraints listed at decision time: verified, not unavailable, and
    /// holding spare capacity. A delta larger than what remains is clamped
    /// rather than rejected — partial-capacity candidates are scored and
    /// surfaced as trade-offs, so confirming one commits what is left.
    /// Racing commits over the same resource are resolved here,
    /// last-valid-commit-wins. A fully committed resource flips to
    /// `deployed`.
    pub fn commit(&self, id: &ResourceId, delta: u32) -> Result<Resource, CommitConflict> {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        let resource = inner.get_mut(id).ok_or(CommitConflict::NotFound)?;

        if !resource.verified {
            return Err(CommitConflict::Unverified);
        }
        if resource.availability == Availability::Unavailable {
            return Err(CommitConflict::Unavailable(resource.availability));
        }
        let remaining = resource.remaining_capacity();
        if remaining == 0 {
            return Err(CommitConflict::Exhausted);
        }

        let applied = delta.min(remaining);
        resource.committed += applied;
        if !resource.has_spare_capacity() {
            resource.availability = Availability::Deployed;
        }

        info!(
            resource_id = %id,
            requested = delta,
            applied,
            remaining = resource.remaining_capacity(),
            availability = %resource.availability,
            "Resource commit applied"
        );

        Ok(resource.clone())
    }

    /// Release previously committed capacity (operator surface).
    pub fn release(&self, id: &ResourceId, delta: u32) -> Result<Resource, CommitConflict> {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        let resource = inner.get_mut(id).ok_or(CommitConflict::NotFound)?;

        resource.committed = resource.committed.saturating_sub(delta);
        if resource.availability == Availability::Deployed && resource.has_spare_capacity() {
            resource.availability = Availability::Available;
        }

        info!(
            resource_id = %id,
            delta,
            remaining = resource.remaining_capacity(),
            "Resource capacity released"
        );

        Ok(resource.clone())
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
