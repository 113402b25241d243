pub mod models;
pub mod registry;

pub use models::{Availability, Resource, ResourceKind};
pub use registry::{CommitConflict, ResourceRegistry};
