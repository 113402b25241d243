pub mod lifecycle;
pub mod models;

pub use lifecycle::{RequestLifecycle, RequestState};
pub use models::{
    ComponentScores, ExtractedNeed, HumanOutcome, MatchCandidate, MatchSource, NeedRequest,
    RequestDecision, RequestLocation, Resolution,
};
