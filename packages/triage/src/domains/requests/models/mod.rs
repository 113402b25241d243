//! Request domain models

pub mod decision;
pub mod need_request;

pub use decision::{
    ComponentScores, HumanOutcome, MatchCandidate, MatchSource, RequestDecision, Resolution,
};
pub use need_request::{ExtractedNeed, NeedRequest, RequestLocation};
