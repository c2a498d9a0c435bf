//! Scoring configuration for CyberPath.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`CYBERPATH__SCORING__*`)
//! 2. Config file (`cyberpath.toml`, `[scoring]` section)
//! 3. Defaults
//!
//! The loaded value is validated before it is handed to the engine, so a
//! misconfigured run fails before any node is scored.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Upper bound for [`ScoringConfig::precision`].
pub const MAX_PRECISION: u32 = 6;

/// Inclusive integer scale shared by severity, feasibility, and expertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScale {
    #[serde(default = "default_scale_min")]
    pub min: u8,
    #[serde(default = "default_scale_max")]
    pub max: u8,
}

impl RatingScale {
    pub fn contains(&self, value: i64) -> bool {
        value >= i64::from(self.min) && value <= i64::from(self.max)
    }

    /// Mirror a rating across the scale: `min` becomes `max` and vice versa.
    ///
    /// Used for expertise, which is a barrier: the more skill an attack
    /// needs, the lower its risk contribution. Computed in `u16`.
    pub fn invert(&self, value: u8) -> u16 {
        u16::from(self.min) + u16::from(self.max) - u16::from(value)
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self {
            min: default_scale_min(),
            max: default_scale_max(),
        }
    }
}

/// How node scores along a chain are folded into its cumulative score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainAggregation {
    /// Arithmetic mean of every node score in the chain.
    #[default]
    Mean,
    /// Weighted mean; the node at depth `d` has weight `d + 1`.
    DepthWeighted,
}

impl ChainAggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::DepthWeighted => "depth_weighted",
        }
    }
}

/// Scoring configuration parameters.
///
/// `score = severity_weight × severity + feasibility_weight × feasibility
///        + expertise_weight × invert(expertise)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Contribution of impact (default 0.4).
    #[serde(default = "default_severity_weight")]
    pub severity_weight: f64,

    /// Contribution of ease of execution (default 0.3).
    #[serde(default = "default_feasibility_weight")]
    pub feasibility_weight: f64,

    /// Contribution of the inverted skill barrier (default 0.3).
    #[serde(default = "default_expertise_weight")]
    pub expertise_weight: f64,

    /// Rating scale for all three ratings (default 1..=5).
    #[serde(default)]
    pub scale: RatingScale,

    /// Decimal places kept in node and chain scores (default 2).
    #[serde(default = "default_precision")]
    pub precision: u32,

    /// Cumulative chain score policy (default mean).
    #[serde(default)]
    pub aggregation: ChainAggregation,
}

impl ScoringConfig {
    /// Check the configuration against the scoring contract.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let weights = [
            ("severity_weight", self.severity_weight),
            ("feasibility_weight", self.feasibility_weight),
            ("expertise_weight", self.expertise_weight),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidWeight { field, value });
            }
        }

        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigurationError::WeightsNotNormalized { sum });
        }

        if self.scale.min > self.scale.max {
            return Err(ConfigurationError::InvalidScale {
                min: self.scale.min,
                max: self.scale.max,
            });
        }

        if self.precision > MAX_PRECISION {
            return Err(ConfigurationError::InvalidPrecision {
                precision: self.precision,
                max: MAX_PRECISION,
            });
        }

        Ok(())
    }

    /// Round a score to the configured number of decimal places.
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.precision as i32);
        (value * factor).round() / factor
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            severity_weight: default_severity_weight(),
            feasibility_weight: default_feasibility_weight(),
            expertise_weight: default_expertise_weight(),
            scale: RatingScale::default(),
            precision: default_precision(),
            aggregation: ChainAggregation::default(),
        }
    }
}

fn default_severity_weight() -> f64 {
    0.4
}

fn default_feasibility_weight() -> f64 {
    0.3
}

fn default_expertise_weight() -> f64 {
    0.3
}

fn default_precision() -> u32 {
    2
}

fn default_scale_min() -> u8 {
    1
}

fn default_scale_max() -> u8 {
    5
}

/// Load and validate the `[scoring]` section.
///
/// `file_prefix` is passed to the `config` crate, so `cyberpath` resolves
/// `cyberpath.toml`, `cyberpath.yaml`, or `cyberpath.json` when present.
/// A missing section falls back to [`ScoringConfig::default`].
pub fn load_scoring_config(file_prefix: &str) -> Result<ScoringConfig, ConfigurationError> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("CYBERPATH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let scoring = match cfg.get::<ScoringConfig>("scoring") {
        Ok(c) => c,
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(file_prefix, "No [scoring] section, using defaults");
            ScoringConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    scoring.validate()?;
    Ok(scoring)
}
