// Copyright 2025 Lars Brubaker
// License: MIT
//
// Face reconstruction from the recorded shrink history.

use std::collections::{HashMap, HashSet};

use glam::DVec3;
use serde::Serialize;
use tracing::warn;

use super::{CapKind, SkeletonBuilder};
use crate::edge::slope_plane;
use crate::error::{Result, SkeletonError};
use crate::geom::{newell_normal, point_on_plane, Plane};
use crate::tolerance::{EPSILON, MERGE_RADIUS, ON_LOCUS, PLANARITY};
use crate::vertex::VertexId;
use crate::weights::{SlopePhase, WeightClass};

/// One planar roof face rising from a footprint edge.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoofFace {
    /// Caller index of the footprint edge.
    pub edge: usize,
    pub class: WeightClass,
    pub phase: SlopePhase,
    /// Counter-clockwise seen from the outside of the roof, starting at the
    /// footprint edge's first corner when the face touches the footprint.
    pub vertices: Vec<VertexId>,
    pub points: Vec<DVec3>,
    /// Slope plane the face lies in.
    pub plane: Plane,
}

impl RoofFace {
    pub fn area(&self) -> f64 {
        newell_normal(&self.points).length() * 0.5
    }

    /// Largest distance of a face point from the face plane.
    pub fn plane_deviation(&self) -> f64 {
        self.points
            .iter()
            .map(|p| self.plane.signed_distance(*p).abs())
            .fold(0.0, f64::max)
    }
}

type Segment = (VertexId, VertexId);

impl<'a> SkeletonBuilder<'a> {
    pub(super) fn reconstruct_faces(&self) -> Result<Vec<RoofFace>> {
        let mut faces = Vec::new();
        for edge in 0..self.points.len() {
            for phase in [SlopePhase::Lower, SlopePhase::Upper] {
                let segments = self.face_segments(edge, phase);
                if segments.is_empty() {
                    continue;
                }
                let plane = self.face_plane(edge, phase)?;
                let start = (phase == SlopePhase::Lower)
                    .then(|| self.arena.canonical(self.footprint[edge]));
                for path in walk_loops(&segments, start) {
                    if let Some(face) = self.make_face(edge, phase, path, plane, start) {
                        faces.push(face);
                    }
                }
            }
        }
        Ok(faces)
    }

    /// Boundary segments of the faces of one footprint edge and phase: its
    /// caps plus the trajectory of every vertex whose wavefront edges derive
    /// from it. Twin groups collapse to one vertex.
    fn face_segments(&self, edge: usize, phase: SlopePhase) -> Vec<Segment> {
        let mut seen: HashSet<Segment> = HashSet::new();
        let mut out = Vec::new();
        let mut add = |a: VertexId, b: VertexId| {
            let (a, b) = (self.arena.canonical(a), self.arena.canonical(b));
            if a != b && seen.insert((a.min(b), a.max(b))) {
                out.push((a, b));
            }
        };

        for cap in self.caps.iter().filter(|c| c.edge == edge && c.phase == phase) {
            add(cap.from, cap.to);
        }
        for v in self.arena.iter() {
            if v.phase != phase || (v.edge_in != edge && v.edge_out != edge) {
                continue;
            }
            if let Some(child) = v.child {
                add(v.id, child);
            }
        }
        out
    }

    /// Lower faces lie in the footprint edge's slope plane; upper faces in the
    /// plane of the upper weight through the slope-change boundary.
    fn face_plane(&self, edge: usize, phase: SlopePhase) -> Result<Plane> {
        let origin = match phase {
            SlopePhase::Lower => Some(self.points[edge]),
            SlopePhase::Upper => self
                .caps
                .iter()
                .find(|c| c.edge == edge && c.phase == phase && c.kind == CapKind::Boundary)
                .map(|c| self.arena.position(c.from)),
        };
        origin
            .and_then(|o| {
                let weight = self.weights.weight(edge, phase);
                slope_plane(o, self.weights.direction(edge), self.up, &weight)
            })
            .ok_or_else(|| {
                SkeletonError::accuracy(format!("no slope plane for face of edge {edge}"))
            })
    }

    fn make_face(
        &self,
        edge: usize,
        phase: SlopePhase,
        path: Vec<VertexId>,
        plane: Plane,
        start: Option<VertexId>,
    ) -> Option<RoofFace> {
        let mut vertices: Vec<VertexId> = Vec::with_capacity(path.len());
        let mut points: Vec<DVec3> = Vec::with_capacity(path.len());
        for v in path {
            let p = self.arena.position(v);
            if points.last().is_some_and(|q: &DVec3| q.distance(p) <= MERGE_RADIUS) {
                continue;
            }
            vertices.push(v);
            points.push(p);
        }
        while points.len() > 1 && points[0].distance(points[points.len() - 1]) <= MERGE_RADIUS {
            points.pop();
            vertices.pop();
        }
        // A merged wavefront edge can leave a zero-width spike along a ridge.
        while let Some(i) = find_spike(&points) {
            points.remove(i);
            vertices.remove(i);
        }
        if points.len() < 3 || newell_normal(&points).length() < EPSILON {
            return None;
        }

        if !points.iter().all(|p| point_on_plane(*p, &plane, PLANARITY)) {
            warn!(edge = self.edge_map[edge], ?phase, "face drifts off its slope plane");
        }
        if newell_normal(&points).dot(plane.normal) < 0.0 {
            points.reverse();
            vertices.reverse();
        }
        if let Some(pos) = start.and_then(|s| vertices.iter().position(|&v| v == s)) {
            points.rotate_left(pos);
            vertices.rotate_left(pos);
        }

        Some(RoofFace {
            edge: self.edge_map[edge],
            class: self.weights.class(edge),
            phase,
            vertices,
            points,
            plane,
        })
    }
}

/// Index of a point where the outline turns straight back on itself.
fn find_spike(points: &[DVec3]) -> Option<usize> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    (0..n).find(|&i| {
        let (prev, cur, next) = (points[(i + n - 1) % n], points[i], points[(i + 1) % n]);
        match ((cur - prev).try_normalize(), (next - cur).try_normalize()) {
            (Some(a), Some(b)) => a.cross(b).length() < ON_LOCUS && a.dot(b) < 0.0,
            _ => false,
        }
    })
}

/// Walk undirected segments into vertex loops. Open chains are walked from
/// one end, so the closing segment is implied.
fn walk_loops(segments: &[Segment], start: Option<VertexId>) -> Vec<Vec<VertexId>> {
    let mut adjacency: HashMap<VertexId, Vec<usize>> = HashMap::new();
    for (i, &(a, b)) in segments.iter().enumerate() {
        adjacency.entry(a).or_default().push(i);
        adjacency.entry(b).or_default().push(i);
    }
    let mut nodes: Vec<VertexId> = adjacency.keys().copied().collect();
    nodes.sort();

    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();
    loop {
        let free = |v: &VertexId, used: &[bool]| adjacency[v].iter().filter(|&&s| !used[s]).count();
        let first = start
            .filter(|s| adjacency.contains_key(s) && free(s, &used) % 2 == 1)
            .or_else(|| nodes.iter().copied().find(|v| free(v, &used) % 2 == 1))
            .or_else(|| start.filter(|s| adjacency.contains_key(s) && free(s, &used) > 0))
            .or_else(|| nodes.iter().copied().find(|v| free(v, &used) > 0));
        let Some(first) = first else {
            break;
        };

        let mut path = vec![first];
        let mut cur = first;
        while let Some(&s) = adjacency[&cur].iter().find(|&&s| !used[s]) {
            used[s] = true;
            let (a, b) = segments[s];
            let next = if a == cur { b } else { a };
            if next == first {
                break;
            }
            path.push(next);
            cur = next;
        }
        loops.push(path);
    }
    loops
}
