// Demo driver: seeds a small resource registry, runs one emergency request
// through matching and walks the human confirmation step.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use triage_core::common::{DispatcherId, GeoPoint, NeedType};
use triage_core::domains::matching::MatchMode;
use triage_core::domains::requests::{ExtractedNeed, NeedRequest, RequestLocation};
use triage_core::domains::resources::{Resource, ResourceKind, ResourceRegistry};
use triage_core::{Config, TriageEngine};

fn sample_registry() -> ResourceRegistry {
    ResourceRegistry::with_resources([
        Resource::new(
            "ambulance-001",
            ResourceKind::Ambulance,
            "City Hospital Ambulance Unit A",
            GeoPoint::new(40.7128, -74.0060),
            4,
        )
        .with_capabilities([NeedType::MedicalAid, NeedType::Evacuation])
        .with_response_time(8),
        Resource::new(
            "medical-team-001",
            ResourceKind::MedicalTeam,
            "Red Cross Field Medical Team",
            GeoPoint::new(40.7306, -73.9866),
            20,
        )
        .with_capabilities([NeedType::MedicalAid, NeedType::PsychologicalSupport]),
        Resource::new(
            "water-truck-001",
            ResourceKind::WaterSupplies,
            "Municipal Water Distribution Truck",
            GeoPoint::new(40.6892, -74.0445),
            500,
        )
        .with_capabilities([NeedType::Water]),
        Resource::new(
            "shelter-team-001",
            ResourceKind::ShelterTeam,
            "Community Center Shelter Team",
            GeoPoint::new(40.7580, -73.9855),
            150,
        )
        .with_capabilities([NeedType::Shelter, NeedType::Blankets, NeedType::Food]),
        Resource::new(
            "rescue-team-001",
            ResourceKind::RescueTeam,
            "Urban Search and Rescue Squad",
            GeoPoint::new(40.7061, -74.0087),
            10,
        )
        .with_capabilities([NeedType::Rescue, NeedType::Evacuation, NeedType::MedicalAid])
        .with_response_time(12),
    ])
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let registry = Arc::new(sample_registry());
    let engine = TriageEngine::new(config, registry)?;

    let request = NeedRequest::new(
        vec![
            ExtractedNeed::new(NeedType::MedicalAid, 0.92),
            ExtractedNeed::new(NeedType::Evacuation, 0.61),
        ],
        RequestLocation::resolved(
            "collapsed building near Broadway and Chambers",
            GeoPoint::new(40.7145, -74.0059),
            0.88,
        ),
    )
    .with_people_affected(5)
    .with_urgency(0.9);
    let request_id = request.id;

    let decision = engine.process(request, MatchMode::Auto).await?;

    println!("Decision for request {request_id} ({} path):", decision.path);
    for (rank, candidate) in decision.candidates.iter().enumerate() {
        println!(
            "  {}. {} [{}] score {:.3} confidence {}",
            rank + 1,
            candidate.resource_name,
            candidate.resource_id,
            candidate.final_score,
            candidate.confidence,
        );
        if let Some(eta) = candidate.estimated_arrival_minutes {
            println!("       eta ~{eta} min");
        }
        for line in &candidate.reasoning {
            println!("       - {line}");
        }
        for trade_off in &candidate.trade_offs {
            println!("       ! {trade_off}");
        }
    }
    for warning in &decision.warnings {
        println!("  warning: {warning}");
    }

    let top = decision
        .top_candidate()
        .map(|c| c.resource_id.clone())
        .ok_or_else(|| anyhow::anyhow!("no candidates to confirm"))?;

    let resolved = engine.confirm(
        request_id,
        &top,
        DispatcherId::new("demo-dispatcher"),
        Some("confirmed from demo driver".to_string()),
    )?;

    info!(
        request_id = %request_id,
        resource_id = %top,
        "Dispatch confirmed"
    );
    println!(
        "\nDispatched {top}; request state: {}",
        engine
            .state(request_id)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    println!("Audit records: {}", engine.audit_trail(request_id).len());
    println!("Resolved: {}", resolved.is_resolved());

    Ok(())
}
