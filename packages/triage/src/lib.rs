// Crisis Triage - Matching & Dispatch Orchestration Engine
//
// This crate matches structured emergency need-requests to a registry of
// verified responder resources. It produces ranked, explained recommendations
// that a human dispatcher must confirm before any resource is committed.
//
// The transport layer, persistent storage, geocoding and free-text extraction
// are external collaborators; this crate covers scoring, request lifecycle
// and auditing only.

pub mod common;
pub mod config;
pub mod domains;
pub mod engine;
pub mod kernel;

pub use config::*;
pub use engine::TriageEngine;
