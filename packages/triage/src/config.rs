use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};

use crate::common::EngineError;

/// Tolerance when checking that weights sum to 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Per-factor scoring weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchWeights {
    pub suitability: f64,
    pub availability: f64,
    pub capacity: f64,
    pub distance: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            suitability: 0.40,
            availability: 0.30,
            capacity: 0.15,
            distance: 0.15,
        }
    }
}

impl MatchWeights {
    pub fn sum(&self) -> f64 {
        self.suitability + self.availability + self.capacity + self.distance
    }

    /// Validate weight values. Fatal at startup if this fails.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, value) in [
            ("suitability", self.suitability),
            ("availability", self.availability),
            ("capacity", self.capacity),
            ("distance", self.distance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Configuration(format!(
                    "weight_{name} must be within [0, 1], got {value}"
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::Configuration(format!(
                "matching weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Engine configuration, loaded once at startup and immutable thereafter.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the AI-assisted scoring path may be attempted at all.
    pub enable_ai_matching: bool,
    /// Minimum extraction confidence to attempt the AI path (inclusive).
    pub ai_min_confidence: f64,
    /// Per-factor scoring weights.
    pub weights: MatchWeights,
    /// Deadline for a single reasoning-service call.
    pub reasoning_timeout: Duration,
    /// Base URL of the reasoning service, if one is configured.
    pub reasoning_base_url: Option<String>,
    /// Model identifier passed to the reasoning service.
    pub reasoning_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_ai_matching: false,
            ai_min_confidence: 0.6,
            weights: MatchWeights::default(),
            reasoning_timeout: Duration::from_secs(3),
            reasoning_base_url: None,
            reasoning_model: "gpt-4-turbo".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();

        let config = Self {
            enable_ai_matching: env::var("ENABLE_AI_MATCHING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.enable_ai_matching),
            ai_min_confidence: parse_var("AI_MATCHING_MIN_CONFIDENCE", defaults.ai_min_confidence)?,
            weights: MatchWeights {
                suitability: parse_var("WEIGHT_SUITABILITY", defaults.weights.suitability)?,
                availability: parse_var("WEIGHT_AVAILABILITY", defaults.weights.availability)?,
                capacity: parse_var("WEIGHT_CAPACITY", defaults.weights.capacity)?,
                distance: parse_var("WEIGHT_DISTANCE", defaults.weights.distance)?,
            },
            reasoning_timeout: Duration::from_secs_f64(parse_var(
                "REASONING_TIMEOUT_SECONDS",
                defaults.reasoning_timeout.as_secs_f64(),
            )?),
            reasoning_base_url: env::var("REASONING_BASE_URL").ok(),
            reasoning_model: env::var("REASONING_MODEL").unwrap_or(defaults.reasoning_model),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Any failure here is fatal.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.weights.validate()?;

        if !(0.0..=1.0).contains(&self.ai_min_confidence) {
            return Err(EngineError::Configuration(format!(
                "AI_MATCHING_MIN_CONFIDENCE must be within [0, 1], got {}",
                self.ai_min_confidence
            )));
        }

        if self.reasoning_timeout.is_zero() {
            return Err(EngineError::Configuration(
                "REASONING_TIMEOUT_SECONDS must be positive".to_string(),
            ));
        }

        if self.enable_ai_matching && self.reasoning_base_url.is_none() {
            return Err(EngineError::Configuration(
                "ENABLE_AI_MATCHING requires REASONING_BASE_URL".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var(name: &str, default: f64) -> Result<f64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a valid number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
