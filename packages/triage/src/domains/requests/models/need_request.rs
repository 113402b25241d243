//! NeedRequest model - the typed, extracted representation of an emergency
//! report.
//!
//! Produced by the upstream extraction collaborator; the engine consumes it
//! read-only and never re-derives its fields.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{GeoPoint, NeedType, RequestId};

/// A single extracted need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedNeed {
    pub need_type: NeedType,
    pub quantity: Option<u32>,
    /// Extraction confidence for this need, in [0, 1].
    pub confidence: f64,
}

impl ExtractedNeed {
    pub fn new(need_type: NeedType, confidence: f64) -> Self {
        Self {
            need_type,
            quantity: None,
            confidence,
        }
    }
}

/// Location information extracted from the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLocation {
    pub raw_text: String,
    /// Geocoded coordinates, when the upstream geocoder resolved them.
    pub point: Option<GeoPoint>,
    pub confidence: f64,
}

impl RequestLocation {
    pub fn unresolved(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            point: None,
            confidence: 0.0,
        }
    }

    pub fn resolved(raw_text: impl Into<String>, point: GeoPoint, confidence: f64) -> Self {
        Self {
            raw_text: raw_text.into(),
            point: Some(point),
            confidence,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.point.is_some()
    }
}

/// Structured need-request. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedRequest {
    pub id: RequestId,
    /// Ordered set of extracted needs (extraction order preserved).
    pub needs: Vec<ExtractedNeed>,
    pub people_affected: Option<u32>,
    pub location: RequestLocation,
    /// Urgency in [0, 1], scored upstream.
    pub urgency_score: f64,
    /// Overall extraction confidence in [0, 1].
    pub extraction_confidence: f64,
    pub received_at: DateTime<Utc>,
}

impl NeedRequest {
    pub fn new(needs: Vec<ExtractedNeed>, location: RequestLocation) -> Self {
        Self {
            id: RequestId::new(),
            needs,
            people_affected: None,
            location,
            urgency_score: 0.5,
            extraction_confidence: 1.0,
            received_at: Utc::now(),
        }
    }

    pub fn with_people_affected(mut self, count: u32) -> Self {
        self.people_affected = Some(count);
        self
    }

    pub fn with_urgency(mut self, urgency_score: f64) -> Self {
        self.urgency_score = urgency_score;
        self
    }

    pub fn with_extraction_confidence(mut self, confidence: f64) -> Self {
        self.extraction_confidence = confidence;
        self
    }

    /// The highest-confidence need, used as the primary suitability anchor.
    pub fn primary_need(&self) -> Option<NeedType> {
        self.needs
            .iter()
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|n| n.need_type)
    }

    /// Distinct need types requested.
    pub fn need_types(&self) -> BTreeSet<NeedType> {
        self.needs.iter().map(|n| n.need_type).collect()
    }
}
