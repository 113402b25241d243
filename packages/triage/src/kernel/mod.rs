//! Infrastructure layer: trait seams and external-service bridges.

pub mod reasoning_bridge;
pub mod test_dependencies;
pub mod traits;

pub use reasoning_bridge::ReasoningBridge;
pub use test_dependencies::MockReasoning;
pub use traits::BaseReasoning;
