//! Deterministic rule-based scorer.
//!
//! Pure function of its inputs: identical request and resource snapshots
//! always produce an identical ordering. This is the safety fallback the
//! whole engine rests on, so nothing in here is allowed to suspend, consult
//! a clock, or read shared state.

use tracing::debug;

use crate::common::{distance_km, ConfidenceLevel};
use crate::config::MatchWeights;
use crate::domains::requests::models::{ComponentScores, MatchCandidate, MatchSource, NeedRequest};
use crate::domains::resources::models::{Availability, Resource};

/// Distance at or below which the distance score saturates at 1.0.
const NEAR_THRESHOLD_KM: f64 = 5.0;
/// Distance at or above which the distance score bottoms out at 0.0.
const FAR_THRESHOLD_KM: f64 = 100.0;
/// Distance score assumed when either location is unresolved.
const NEUTRAL_DISTANCE_SCORE: f64 = 0.5;

/// Score every resource against the request and return candidates sorted
/// descending by final score, resource id ascending on ties.
///
/// Resources with zero capability overlap are excluded entirely rather than
/// scored.
pub fn score_resources(
    request: &NeedRequest,
    resources: &[Resource],
    weights: &MatchWeights,
) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = resources
        .iter()
        .filter_map(|resource| score_resource(request, resource, weights))
        .collect();

    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.resource_id.cmp(&b.resource_id))
    });

    debug!(
        request_id = %request.id,
        scored = candidates.len(),
        excluded = resources.len() - candidates.len(),
        "Rule-based scoring complete"
    );

    candidates
}

fn score_resource(
    request: &NeedRequest,
    resource: &Resource,
    weights: &MatchWeights,
) -> Option<MatchCandidate> {
    let mut reasoning = Vec::new();
    let mut trade_offs = Vec::new();

    let suitability = suitability_score(request, resource)?;
    let availability = availability_score(resource);
    let capacity = capacity_score(request, resource);
    let (distance, resolved_km) = distance_score(request, resource, &mut reasoning);

    let scores = ComponentScores {
        suitability: round3(suitability),
        availability: round3(availability),
        capacity: round3(capacity),
        distance: round3(distance),
    };

    let final_score = round3(
        weights.suitability * scores.suitability
            + weights.availability * scores.availability
            + weights.capacity * scores.capacity
            + weights.distance * scores.distance,
    );

    explain(request, resource, &scores, resolved_km, &mut reasoning);
    identify_trade_offs(resource, &scores, resolved_km, &mut trade_offs);

    Some(MatchCandidate {
        resource_id: resource.id.clone(),
        resource_name: resource.name.clone(),
        scores,
        final_score,
        distance_km: resolved_km,
        estimated_arrival_minutes: resolved_km.map(|km| resource.estimated_arrival_minutes(km)),
        reasoning,
        trade_offs,
        confidence: derive_confidence(request, &scores),
        source: MatchSource::RuleBased,
    })
}

/// Fraction of requested need types the resource covers. `None` when the
/// overlap is empty (the resource is excluded). Covering some needs but not
/// the primary one halves the score.
fn suitability_score(request: &NeedRequest, resource: &Resource) -> Option<f64> {
    let requested = request.need_types();
    if requested.is_empty() {
        return Some(1.0);
    }

    let covered = requested.iter().filter(|n| resource.covers(**n)).count();
    if covered == 0 {
        return None;
    }

    let mut score = covered as f64 / requested.len() as f64;
    if let Some(primary) = request.primary_need() {
        if !resource.covers(primary) {
            score *= 0.5;
        }
    }
    Some(score)
}

fn availability_score(resource: &Resource) -> f64 {
    match resource.availability {
        Availability::Available => 1.0,
        Availability::Deployed if resource.has_spare_capacity() => 0.4,
        Availability::Deployed | Availability::Unavailable => 0.0,
    }
}

/// `min(1, remaining / people_affected)`; unknown headcount defaults to 1.0.
fn capacity_score(request: &NeedRequest, resource: &Resource) -> f64 {
    match request.people_affected {
        Some(people) if people > 0 => {
            (resource.remaining_capacity() as f64 / people as f64).min(1.0)
        }
        _ => 1.0,
    }
}

/// Piecewise-linear saturating curve over great-circle distance. Unresolved
/// locations score a fixed neutral value and flag the assumption.
fn distance_score(
    request: &NeedRequest,
    resource: &Resource,
    reasoning: &mut Vec<String>,
) -> (f64, Option<f64>) {
    let Some(point) = request.location.point else {
        reasoning.push(
            "Request location could not be resolved; assuming neutral distance".to_string(),
        );
        return (NEUTRAL_DISTANCE_SCORE, None);
    };

    let km = distance_km(point, resource.location);
    let score = if km <= NEAR_THRESHOLD_KM {
        1.0
    } else if km >= FAR_THRESHOLD_KM {
        0.0
    } else {
        1.0 - (km - NEAR_THRESHOLD_KM) / (FAR_THRESHOLD_KM - NEAR_THRESHOLD_KM)
    };
    (score, Some(round1(km)))
}

fn explain(
    request: &NeedRequest,
    resource: &Resource,
    scores: &ComponentScores,
    resolved_km: Option<f64>,
    reasoning: &mut Vec<String>,
) {
    if scores.suitability >= 1.0 {
        reasoning.push(format!("{} covers every requested need", resource.name));
    } else if scores.suitability >= 0.5 {
        reasoning.push(format!(
            "{} covers part of the requested needs (suitability {:.2})",
            resource.name, scores.suitability
        ));
    } else {
        reasoning.push(format!(
            "{} does not cover the primary need (suitability {:.2})",
            resource.name, scores.suitability
        ));
    }

    match resource.availability {
        Availability::Available => {
            reasoning.push("Currently available for dispatch".to_string());
        }
        Availability::Deployed => {
            reasoning.push("Already deployed but has spare capacity".to_string());
        }
        Availability::Unavailable => {}
    }

    if let Some(people) = request.people_affected {
        reasoning.push(format!(
            "Remaining capacity {} against {} people affected",
            resource.remaining_capacity(),
            people
        ));
    }

    if let Some(km) = resolved_km {
        reasoning.push(format!(
            "{km:.1} km from the reported location, estimated arrival in {} minutes",
            resource.estimated_arrival_minutes(km)
        ));
    }
}

fn identify_trade_offs(
    resource: &Resource,
    scores: &ComponentScores,
    resolved_km: Option<f64>,
    trade_offs: &mut Vec<String>,
) {
    if scores.suitability >= 0.8 && scores.distance <= 0.3 {
        if let Some(km) = resolved_km {
            trade_offs.push(format!("Strong capability match but {km:.1} km away"));
        } else {
            trade_offs.push("Strong capability match but far from the location".to_string());
        }
    }
    if scores.distance >= 0.8 && scores.suitability < 0.5 {
        trade_offs.push("Nearby but only partially matches the requested needs".to_string());
    }
    if resource.availability == Availability::Deployed {
        trade_offs.push("Resource is already committed elsewhere".to_string());
    }
    if scores.capacity < 1.0 {
        trade_offs.push(format!(
            "Capacity may be insufficient: {} remaining",
            resource.remaining_capacity()
        ));
    }
}

/// Confidence starts from the extraction confidence and degrades when the
/// weakest component score is poor.
fn derive_confidence(request: &NeedRequest, scores: &ComponentScores) -> ConfidenceLevel {
    let weakest = scores.min();
    let mut confidence = request.extraction_confidence;
    if weakest < 0.3 {
        confidence *= 0.7;
    } else if weakest < 0.5 {
        confidence *= 0.85;
    }
    ConfidenceLevel::from_score(confidence)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{GeoPoint, NeedType};
    use crate::domains::requests::models::{ExtractedNeed, RequestLocation};
    use crate::domains::resources::models::ResourceKind;

    const DOWNTOWN: GeoPoint = GeoPoint {
        latitude: 40.7128,
        longitude: -74.0060,
    };

    fn medical_request() -> NeedRequest {
        NeedRequest::new(
            vec![ExtractedNeed::new(NeedType::MedicalAid, 0.92)],
            RequestLocation::resolved("downtown", DOWNTOWN, 0.9),
        )
        .with_people_affected(5)
    }

    fn ambulance(id: &str) -> Resource {
        Resource::new(
            id,
            ResourceKind::Ambulance,
            format!("Ambulance {id}"),
            DOWNTOWN,
            6,
        )
        .with_capabilities([NeedType::MedicalAid])
    }

    #[test]
    fn perfect_nearby_match_scores_close_to_one() {
        let request = medical_request();
        let candidates = score_resources(&request, &[ambulance("unit-001")], &MatchWeights::default());

        assert_eq!(candidates.len(), 1);
        let top = &candidates[0];
        assert_eq!(top.scores.suitability, 1.0);
        assert_eq!(top.scores.availability, 1.0);
        assert_eq!(top.scores.capacity, 1.0);
        assert_eq!(top.scores.distance, 1.0);
        assert!((top.final_score - 1.0).abs() < 1e-9);
        assert_eq!(top.confidence, ConfidenceLevel::High);
    }

    #[test]
    fn zero_capability_overlap_excludes_the_resource() {
        let request = medical_request();
        let shelter = Resource::new(
            "shelter-001",
            ResourceKind::ShelterTeam,
            "Shelter Team",
            DOWNTOWN,
            50,
        )
        .with_capabilities([NeedType::Shelter]);

        assert!(score_resources(&request, &[shelter], &MatchWeights::default()).is_empty());
    }

    #[test]
    fn missing_the_primary_need_halves_suitability() {
        let request = NeedRequest::new(
            vec![
                ExtractedNeed::new(NeedType::MedicalAid, 0.92),
                ExtractedNeed::new(NeedType::Water, 0.5),
            ],
            RequestLocation::resolved("downtown", DOWNTOWN, 0.9),
        );
        let water_truck = Resource::new(
            "water-001",
            ResourceKind::WaterSupplies,
            "Water Truck",
            DOWNTOWN,
            100,
        )
        .with_capabilities([NeedType::Water]);

        let candidates = score_resources(&request, &[water_truck], &MatchWeights::default());
        // Covers 1 of 2 needs but not the primary: 0.5 * 0.5.
        assert_eq!(candidates[0].scores.suitability, 0.25);
    }

    #[test]
    fn deployed_with_spare_capacity_scores_partial_availability() {
        let request = medical_request();
        let deployed = ambulance("unit-001")
            .with_availability(Availability::Deployed)
            .with_committed(2);

        let candidates = score_resources(&request, &[deployed], &MatchWeights::default());
        assert_eq!(candidates[0].scores.availability, 0.4);
        assert!(candidates[0]
            .trade_offs
            .iter()
            .any(|t| t.contains("already committed")));
    }

    #[test]
    fn unresolved_location_uses_neutral_distance_with_a_note() {
        let request = NeedRequest::new(
            vec![ExtractedNeed::new(NeedType::MedicalAid, 0.92)],
            RequestLocation::unresolved("somewhere near the river"),
        );

        let candidates =
            score_resources(&request, &[ambulance("unit-001")], &MatchWeights::default());
        let top = &candidates[0];
        assert_eq!(top.scores.distance, 0.5);
        assert_eq!(top.distance_km, None);
        assert_eq!(top.estimated_arrival_minutes, None);
        assert!(top
            .reasoning
            .iter()
            .any(|r| r.contains("neutral distance")));
    }

    #[test]
    fn arrival_estimate_combines_response_time_and_travel() {
        let request = medical_request();
        // Co-located with the request: travel time rounds to zero.
        let nearby = ambulance("unit-001").with_response_time(8);

        let candidates = score_resources(&request, &[nearby], &MatchWeights::default());
        assert_eq!(candidates[0].estimated_arrival_minutes, Some(8));
        assert!(candidates[0]
            .reasoning
            .iter()
            .any(|r| r.contains("estimated arrival")));
    }

    #[test]
    fn distance_curve_decreases_with_range() {
        let request = medical_request();
        // ~111 km north of downtown, past the far threshold.
        let far = Resource::new(
            "unit-far",
            ResourceKind::Ambulance,
            "Far Ambulance",
            GeoPoint::new(41.7128, -74.0060),
            6,
        )
        .with_capabilities([NeedType::MedicalAid]);

        let candidates = score_resources(&request, &[far], &MatchWeights::default());
        assert_eq!(candidates[0].scores.distance, 0.0);
        assert!(candidates[0].distance_km.unwrap() > 100.0);
    }

    #[test]
    fn ordering_is_deterministic_with_id_tie_break() {
        let request = medical_request();
        let resources = vec![ambulance("unit-002"), ambulance("unit-003"), ambulance("unit-001")];

        let first = score_resources(&request, &resources, &MatchWeights::default());
        let second = score_resources(&request, &resources, &MatchWeights::default());

        let ids: Vec<&str> = first.iter().map(|c| c.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["unit-001", "unit-002", "unit-003"]);
        assert_eq!(
            ids,
            second
                .iter()
                .map(|c| c.resource_id.as_str())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn weak_component_scores_degrade_confidence() {
        let request = NeedRequest::new(
            vec![ExtractedNeed::new(NeedType::MedicalAid, 0.92)],
            RequestLocation::resolved("downtown", DOWNTOWN, 0.9),
        )
        .with_people_affected(20)
        .with_extraction_confidence(0.8);

        // Capacity 6 against 20 people: capacity score 0.3 drags the
        // weakest factor below 0.5.
        let candidates =
            score_resources(&request, &[ambulance("unit-001")], &MatchWeights::default());
        assert_eq!(candidates[0].confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn insufficient_capacity_is_a_trade_off() {
        let request = medical_request();
        let small = ambulance("unit-001").with_committed(4);

        let candidates = score_resources(&request, &[small], &MatchWeights::default());
        assert!(candidates[0]
            .trade_offs
            .iter()
            .any(|t| t.contains("Capacity may be insufficient")));
    }
}
