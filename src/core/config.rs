//! Game configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose.
//! Values are read from an optional TOML file; any missing field falls back
//! to its default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{GameError, Result};
use crate::map::metric::DistanceMetric;

/// Top-level configuration for a game session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub partition: PartitionConfig,
    pub spinner: SpinnerConfig,
    pub render: RenderConfig,
    pub save: SaveConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Distance metric used for nearest-seed assignment
    ///
    /// Stored in the save file when a game starts. Changing it changes which
    /// team wins counties near territory boundaries.
    pub metric: DistanceMetric,

    /// Two seeds closer than this to the best distance are treated as tied
    ///
    /// Units follow the metric: metres for haversine, degrees for planar.
    /// Ties go to the lexicographically smallest team id.
    pub tie_epsilon: f64,

    /// Minimum county count before assignment runs on the rayon pool
    pub parallel_threshold: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Haversine,
            tie_epsilon: 1e-6,
            parallel_threshold: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinnerConfig {
    /// Degrees travelled from the attacker's seed for N/S/E/W spins
    pub cardinal_reach: f64,

    /// Degrees travelled on each axis for diagonal spins
    ///
    /// 1.5 on both axes lands roughly as far out as a 2.0 cardinal move.
    pub diagonal_reach: f64,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            cardinal_reach: 2.0,
            diagonal_reach: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output image width in pixels
    pub width: u32,
    /// Output image height in pixels
    pub height: u32,
    /// Half-size of the square drawn for each county centroid
    pub marker_radius: u32,
    /// Background color, `rgb(r, g, b)` or `#rrggbb`
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
            marker_radius: 2,
            background: "rgb(245, 245, 240)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Save file used when the command line does not name one
    pub path: PathBuf,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("imperialism_save.json"),
        }
    }
}

impl GameConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let p = &self.partition;
        if !p.tie_epsilon.is_finite() || p.tie_epsilon < 0.0 {
            return Err(GameError::Config(format!(
                "partition.tie_epsilon must be a non-negative number, got {}",
                p.tie_epsilon
            )));
        }

        let s = &self.spinner;
        for (name, reach) in [
            ("cardinal_reach", s.cardinal_reach),
            ("diagonal_reach", s.diagonal_reach),
        ] {
            if !reach.is_finite() || reach <= 0.0 {
                return Err(GameError::Config(format!(
                    "spinner.{} must be positive, got {}",
                    name, reach
                )));
            }
        }

        let r = &self.render;
        if r.width == 0 || r.height == 0 {
            return Err(GameError::Config(format!(
                "render size must be non-zero, got {}x{}",
                r.width, r.height
            )));
        }
        // Surface bad colors at load time rather than at render time
        r.background
            .parse::<crate::map::Color>()
            .map_err(|e| GameError::Config(format!("render.background: {}", e)))?;

        Ok(())
    }
}
