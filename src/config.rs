// Copyright 2025 Lars Brubaker
// License: MIT

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkeletonError};
use crate::weights::check_weight;

pub const DEFAULT_MAX_ITERATION_DEPTH: usize = 256;

/// Slope change at a fixed height above the footprint.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MansardConfig {
    /// Height above the footprint plane at which the slope changes.
    pub height: f64,
    /// Weight for edges tagged Main above `height`.
    pub main_weight: f64,
    /// Weight for edges tagged Side above `height`.
    pub side_weight: f64,
}

/// Run configuration for [`crate::Skeleton`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    /// Maximum shrink depth of any wavefront lineage.
    pub max_iteration_depth: usize,
    pub mansard: Option<MansardConfig>,
    /// Scale applied to the footprint about its centroid before building.
    /// Values above 1 give an eave overhang.
    pub footprint_scale: f64,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        SkeletonConfig {
            max_iteration_depth: DEFAULT_MAX_ITERATION_DEPTH,
            mansard: None,
            footprint_scale: 1.0,
        }
    }
}

impl SkeletonConfig {
    /// Parse and validate a JSON configuration bundle. Missing fields take
    /// their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: SkeletonConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_mansard(mut self, height: f64, main_weight: f64, side_weight: f64) -> Self {
        self.mansard = Some(MansardConfig { height, main_weight, side_weight });
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iteration_depth == 0 {
            return Err(SkeletonError::Config("max_iteration_depth must be at least 1".into()));
        }
        if !self.footprint_scale.is_finite() || self.footprint_scale <= 0.0 {
            return Err(SkeletonError::Config(format!(
                "footprint_scale must be positive, got {}",
                self.footprint_scale
            )));
        }
        if let Some(m) = &self.mansard {
            if !m.height.is_finite() || m.height <= 0.0 {
                return Err(SkeletonError::Config(format!(
                    "mansard height must be positive, got {}",
                    m.height
                )));
            }
            check_weight(m.main_weight, "mansard main weight")
                .and_then(|_| check_weight(m.side_weight, "mansard side weight"))
                .map_err(|e| SkeletonError::Config(e.to_string()))?;
        }
        Ok(())
    }
}
