//! Resource domain models

pub mod resource;

pub use resource::{Availability, Resource, ResourceKind};
