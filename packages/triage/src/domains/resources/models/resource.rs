//! Resource model - verified responder assets eligible for matching.
//!
//! Resources are owned by the registry. The engine never writes their fields
//! directly; it issues commit/release intents which the registry applies
//! atomically.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::common::{GeoPoint, NeedType, ResourceId};

/// Availability state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Deployed,
    Unavailable,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "available"),
            Availability::Deployed => write!(f, "deployed"),
            Availability::Unavailable => write!(f, "unavailable"),
        }
    }
}

impl FromStr for Availability {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "available" => Ok(Availability::Available),
            "deployed" => Ok(Availability::Deployed),
            "unavailable" => Ok(Availability::Unavailable),
            _ => Err(anyhow::anyhow!("Invalid availability: {}", s)),
        }
    }
}

/// Categories of responder resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Ambulance,
    MedicalTeam,
    FoodSupplies,
    WaterSupplies,
    ShelterTeam,
    RescueTeam,
    Transport,
    Supplies,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Ambulance => "ambulance",
            ResourceKind::MedicalTeam => "medical_team",
            ResourceKind::FoodSupplies => "food_supplies",
            ResourceKind::WaterSupplies => "water_supplies",
            ResourceKind::ShelterTeam => "shelter_team",
            ResourceKind::RescueTeam => "rescue_team",
            ResourceKind::Transport => "transport",
            ResourceKind::Supplies => "supplies",
        };
        write!(f, "{s}")
    }
}

/// A verified responder asset (vehicle, team, supply cache).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub name: String,

    /// Need types this resource can service.
    pub capabilities: BTreeSet<NeedType>,

    pub availability: Availability,

    /// Total capacity (people served).
    pub capacity: u32,
    /// Capacity already committed to dispatched requests.
    pub committed: u32,

    /// Only verified resources are ever eligible for matching.
    pub verified: bool,

    pub location: GeoPoint,

    /// Mobilization time before the resource starts moving, in minutes.
    pub response_time_minutes: u32,
}

/// Assumed average speed once a resource is moving, for arrival estimates.
const AVG_RESPONSE_SPEED_KMH: f64 = 40.0;

/// Mobilization time assumed when the operator supplies none.
const DEFAULT_RESPONSE_TIME_MINUTES: u32 = 15;

impl Resource {
    pub fn new(
        id: impl Into<ResourceId>,
        kind: ResourceKind,
        name: impl Into<String>,
        location: GeoPoint,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            capabilities: BTreeSet::new(),
            availability: Availability::Available,
            capacity,
            committed: 0,
            verified: true,
            location,
            response_time_minutes: DEFAULT_RESPONSE_TIME_MINUTES,
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = NeedType>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    pub fn with_committed(mut self, committed: u32) -> Self {
        self.committed = committed;
        self
    }

    pub fn with_response_time(mut self, minutes: u32) -> Self {
        self.response_time_minutes = minutes;
        self
    }

    /// Capacity not yet committed.
    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.committed)
    }

    pub fn has_spare_capacity(&self) -> bool {
        self.remaining_capacity() > 0
    }

    /// Whether the resource can service the given need type.
    pub fn covers(&self, need: NeedType) -> bool {
        self.capabilities.contains(&need)
    }

    /// Whether the resource may appear in a candidate set at all.
    pub fn is_eligible(&self) -> bool {
        self.verified && self.availability != Availability::Unavailable
    }

    /// Estimated minutes until arrival: mobilization plus travel at the
    /// assumed average response speed.
    pub fn estimated_arrival_minutes(&self, distance_km: f64) -> u32 {
        let travel = distance_km / AVG_RESPONSE_SPEED_KMH * 60.0;
        self.response_time_minutes + travel.round() as u32
    }
}
