// Copyright 2025 Lars Brubaker
// License: MIT
//
// Per-run edge weight lookup. A weight w encodes the roof pitch as
// asin(w): 1.0 is a vertical gable wall, 0.7071 is 45 degrees.
// The table is built once per run and never mutated; the mansard slope
// change is expressed as a second phase instead of a global rewrite.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::config::MansardConfig;
use crate::error::{Result, SkeletonError};

/// Which slope family a roof face belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightClass {
    Main,
    Side,
}

/// Below or above the mansard slope change.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlopePhase {
    #[default]
    Lower,
    Upper,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub value: f64,
    pub class: WeightClass,
}

impl EdgeWeight {
    pub fn main(value: f64) -> Self {
        EdgeWeight { value, class: WeightClass::Main }
    }

    pub fn side(value: f64) -> Self {
        EdgeWeight { value, class: WeightClass::Side }
    }

    /// Pitch in radians above the footprint plane.
    #[inline]
    pub fn pitch(&self) -> f64 {
        self.value.clamp(-1.0, 1.0).asin()
    }
}

impl From<f64> for EdgeWeight {
    fn from(value: f64) -> Self {
        EdgeWeight::main(value)
    }
}

pub(crate) fn check_weight(value: f64, what: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(SkeletonError::input(format!(
            "{what} must be in (0, 1], got {value}"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug)]
struct EdgeEntry {
    weight: EdgeWeight,
    direction: DVec3,
}

/// Weight table indexed by footprint edge.
#[derive(Clone, Debug)]
pub struct EdgeWeights {
    edges: Vec<EdgeEntry>,
    mansard: Option<MansardConfig>,
}

impl EdgeWeights {
    /// `directions[i]` is the unit direction of footprint edge `i`.
    pub fn new(
        weights: &[EdgeWeight],
        directions: &[DVec3],
        mansard: Option<MansardConfig>,
    ) -> Self {
        let edges = weights
            .iter()
            .zip(directions)
            .map(|(w, d)| EdgeEntry { weight: *w, direction: *d })
            .collect();
        EdgeWeights { edges, mansard }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn class(&self, edge: usize) -> WeightClass {
        self.edges[edge].weight.class
    }

    pub fn direction(&self, edge: usize) -> DVec3 {
        self.edges[edge].direction
    }

    pub fn mansard(&self) -> Option<&MansardConfig> {
        self.mansard.as_ref()
    }

    /// Weight of footprint edge `edge` in `phase`. Without a mansard
    /// configuration the upper phase falls back to the footprint weight.
    pub fn weight(&self, edge: usize, phase: SlopePhase) -> EdgeWeight {
        let base = self.edges[edge].weight;
        match (phase, self.mansard.as_ref()) {
            (SlopePhase::Upper, Some(m)) => match base.class {
                WeightClass::Main => EdgeWeight::main(m.main_weight),
                WeightClass::Side => EdgeWeight::side(m.side_weight),
            },
            _ => base,
        }
    }
}
