// Copyright 2025 Lars Brubaker
// License: MIT
//
// Weighted wavefront edges. Rebuilt from the live loop every iteration;
// nothing here survives past the iteration that created it.

use glam::DVec3;

use crate::error::{Result, SkeletonError};
use crate::geom::{rotate_about_axis, Plane};
use crate::tolerance::ON_LOCUS;
use crate::vertex::VertexId;
use crate::weights::EdgeWeight;

#[derive(Clone, Debug)]
pub struct Edge {
    pub start: VertexId,
    pub end: VertexId,
    /// Footprint edge this wavefront edge derives from.
    pub source: usize,
    pub weight: EdgeWeight,
    pub direction: DVec3,
    pub length: f64,
    /// Flat inward normal, orthogonal to both the edge and the build direction.
    pub normal: DVec3,
    /// Inward normal tilted up by the edge pitch; lies in the slope plane.
    pub rotated_normal: DVec3,
    pub plane: Plane,
}

impl Edge {
    /// Build the edge `a -> b`. `source_direction` is the footprint edge
    /// direction, used when the live edge is too short to define its own or
    /// runs against its source.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: VertexId,
        end: VertexId,
        a: DVec3,
        b: DVec3,
        source: usize,
        source_direction: DVec3,
        up: DVec3,
        weight: EdgeWeight,
    ) -> Result<Edge> {
        let flat = (b - a) - up * (b - a).dot(up);
        let length = flat.length();
        let direction = match flat.try_normalize() {
            Some(d) if length >= ON_LOCUS && d.dot(source_direction) > 0.0 => d,
            _ => source_direction,
        };

        let (normal, rotated_normal) = slope_frame(direction, up, &weight);
        let plane = Plane::new(a, direction.cross(rotated_normal)).ok_or_else(|| {
            SkeletonError::accuracy(format!("edge {start}->{end} has no slope plane"))
        })?;

        Ok(Edge {
            start,
            end,
            source,
            weight,
            direction,
            length,
            normal,
            rotated_normal,
            plane,
        })
    }
}

/// Flat inward normal and its pitched counterpart for an edge running along
/// `direction` on a counter-clockwise loop.
fn slope_frame(direction: DVec3, up: DVec3, weight: &EdgeWeight) -> (DVec3, DVec3) {
    let inward = up.cross(direction).normalize_or_zero();
    let rotated = rotate_about_axis(inward, direction, weight.pitch());
    (inward, rotated)
}

/// Slope plane of a footprint edge starting at `origin`.
pub fn slope_plane(
    origin: DVec3,
    direction: DVec3,
    up: DVec3,
    weight: &EdgeWeight,
) -> Option<Plane> {
    let (_, rotated) = slope_frame(direction, up, weight);
    Plane::new(origin, direction.cross(rotated))
}
