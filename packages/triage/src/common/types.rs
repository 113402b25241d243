//! Shared enums for needs and confidence grading.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Types of emergency needs the extraction collaborator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedType {
    MedicalAid,
    Food,
    Water,
    Shelter,
    Evacuation,
    Rescue,
    Blankets,
    Clothing,
    Sanitation,
    PsychologicalSupport,
    Other,
}

impl fmt::Display for NeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NeedType::MedicalAid => "medical_aid",
            NeedType::Food => "food",
            NeedType::Water => "water",
            NeedType::Shelter => "shelter",
            NeedType::Evacuation => "evacuation",
            NeedType::Rescue => "rescue",
            NeedType::Blankets => "blankets",
            NeedType::Clothing => "clothing",
            NeedType::Sanitation => "sanitation",
            NeedType::PsychologicalSupport => "psychological_support",
            NeedType::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl FromStr for NeedType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "medical_aid" => Ok(NeedType::MedicalAid),
            "food" => Ok(NeedType::Food),
            "water" => Ok(NeedType::Water),
            "shelter" => Ok(NeedType::Shelter),
            "evacuation" => Ok(NeedType::Evacuation),
            "rescue" => Ok(NeedType::Rescue),
            "blankets" => Ok(NeedType::Blankets),
            "clothing" => Ok(NeedType::Clothing),
            "sanitation" => Ok(NeedType::Sanitation),
            "psychological_support" => Ok(NeedType::PsychologicalSupport),
            "other" => Ok(NeedType::Other),
            _ => Err(anyhow::anyhow!("Invalid need type: {}", s)),
        }
    }
}

/// Confidence grading attached to a match candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Grade a numeric confidence into the three-level scale.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ConfidenceLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(ConfidenceLevel::Low),
            "medium" => Ok(ConfidenceLevel::Medium),
            "high" => Ok(ConfidenceLevel::High),
            _ => Err(anyhow::anyhow!("Invalid confidence level: {}", s)),
        }
    }
}
