// Copyright 2025 Lars Brubaker
// WASM bindings for roof-skeleton

use glam::DVec3;
use roof_skeleton::{
    EdgeWeight, Footprint, RoofSkeleton, Skeleton, SkeletonConfig, SlopePhase, WeightClass,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn main_js() {
    console_error_panic_hook::set_once();
}

/// A footprint plus its last built roof.
#[wasm_bindgen]
pub struct RoofSkeletonJs {
    roof: Option<RoofSkeleton>,
    error: Option<String>,
}

#[wasm_bindgen]
impl RoofSkeletonJs {
    #[wasm_bindgen(constructor)]
    pub fn new() -> RoofSkeletonJs {
        RoofSkeletonJs { roof: None, error: None }
    }

    /// Build from a flat [x0,y0, x1,y1, ...] outline and one weight per edge.
    /// Negative weights mark Side edges. `config` is an optional JSON bundle.
    /// Returns true on success; see `error()` otherwise.
    pub fn build(&mut self, outline: &[f64], weights: &[f64], config: Option<String>) -> bool {
        let result = parse_config(config.as_deref()).and_then(|config| {
            let points = outline
                .chunks_exact(2)
                .map(|p| DVec3::new(p[0], p[1], 0.0))
                .collect();
            let weights = weights
                .iter()
                .map(|&w| if w < 0.0 { EdgeWeight::side(-w) } else { EdgeWeight::main(w) })
                .collect();
            let footprint = Footprint::new(points, weights, DVec3::Z)?;
            Skeleton::new(config)?.build(&footprint)
        });
        match result {
            Ok(roof) => {
                self.roof = Some(roof);
                self.error = None;
                true
            }
            Err(e) => {
                self.roof = None;
                self.error = Some(e.to_string());
                false
            }
        }
    }

    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }

    pub fn face_count(&self) -> u32 {
        self.roof.as_ref().map_or(0, |r| r.faces().len() as u32)
    }

    pub fn apex_height(&self) -> f64 {
        self.roof.as_ref().map_or(0.0, RoofSkeleton::apex_height)
    }

    /// Flat face points [x0,y0,z0, x1,y1,z1, ...], faces back to back.
    pub fn face_points(&self) -> Vec<f64> {
        self.faces()
            .flat_map(|f| f.points.iter())
            .flat_map(|p| p.to_array())
            .collect()
    }

    /// Start of each face in `face_points`, counted in points, plus the total.
    pub fn face_offsets(&self) -> Vec<u32> {
        let mut offsets = vec![0u32];
        for f in self.faces() {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + f.points.len() as u32);
        }
        offsets
    }

    /// Caller edge index of each face.
    pub fn face_edges(&self) -> Vec<u32> {
        self.faces().map(|f| f.edge as u32).collect()
    }

    /// 0 = Main lower, 1 = Side lower, 2 = Main upper, 3 = Side upper.
    pub fn face_classes(&self) -> Vec<u8> {
        self.faces()
            .map(|f| {
                let class = match f.class {
                    WeightClass::Main => 0,
                    WeightClass::Side => 1,
                };
                let phase = match f.phase {
                    SlopePhase::Lower => 0,
                    SlopePhase::Upper => 2,
                };
                class + phase
            })
            .collect()
    }

    /// Faces as a JSON array.
    pub fn faces_json(&self) -> String {
        self.roof
            .as_ref()
            .and_then(|r| r.faces_json().ok())
            .unwrap_or_else(|| "[]".to_string())
    }
}

impl RoofSkeletonJs {
    fn faces(&self) -> impl Iterator<Item = &roof_skeleton::RoofFace> {
        self.roof.iter().flat_map(|r| r.faces().iter())
    }
}

impl Default for RoofSkeletonJs {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_config(config: Option<&str>) -> roof_skeleton::Result<SkeletonConfig> {
    match config {
        Some(text) if !text.trim().is_empty() => SkeletonConfig::from_json(text),
        _ => Ok(SkeletonConfig::default()),
    }
}

/// Convenience: apex height of a uniformly weighted outline, NaN on failure.
#[wasm_bindgen]
pub fn roof_apex(outline: &[f64], weight: f64) -> f64 {
    let points = outline
        .chunks_exact(2)
        .map(|p| DVec3::new(p[0], p[1], 0.0))
        .collect();
    Footprint::uniform(points, weight, DVec3::Z)
        .and_then(|f| Skeleton::default().build(&f))
        .map_or(f64::NAN, |r| r.apex_height())
}
