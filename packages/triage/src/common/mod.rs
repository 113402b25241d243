//! Shared types used across domains.

pub mod entity_ids;
pub mod errors;
pub mod geo;
pub mod types;

pub use entity_ids::{DispatcherId, RequestId, ResourceId};
pub use errors::EngineError;
pub use geo::{distance_km, GeoPoint};
pub use types::{ConfidenceLevel, NeedType};
