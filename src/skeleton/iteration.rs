// Copyright 2025 Lars Brubaker
// License: MIT
//
// Per-iteration wavefront preparation and event detection.

use glam::DVec3;
use tracing::trace;

use super::SkeletonBuilder;
use crate::edge::Edge;
use crate::error::{Result, SkeletonError};
use crate::event::{Candidate, EdgeRef};
use crate::geom::{
    angle_between, is_reflex, plane_intersection_direction, same_side_of_ray,
    three_plane_intersection, Ray,
};
use crate::polygon::Polygon;
use crate::tolerance::{EPSILON, ON_LOCUS};
use crate::vertex::Vertex;
use crate::weights::SlopePhase;

impl<'a> SkeletonBuilder<'a> {
    /// Build the weighted edges of the loop and refresh every corner's
    /// normal, bisectors and reflex flag from them.
    pub(super) fn finalize(&mut self, polygon: &Polygon, phase: SlopePhase) -> Result<Vec<Edge>> {
        let n = polygon.len();
        let up = self.up;

        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let a = polygon.vertices[i];
            let b = polygon.at(i as isize + 1);
            let source = self.arena[a].edge_out;
            edges.push(Edge::new(
                a,
                b,
                self.arena.position(a),
                self.arena.position(b),
                source,
                self.weights.direction(source),
                up,
                self.weights.weight(source, phase),
            )?);
        }

        for i in 0..n {
            let id = polygon.vertices[i];
            let e_in = &edges[(i + n - 1) % n];
            let e_out = &edges[i];
            let position = self.arena.position(id);

            let turn = e_in.direction.cross(e_out.direction);
            let normal = match turn.try_normalize() {
                Some(t) if turn.length() > EPSILON => {
                    if t.dot(up) < 0.0 {
                        -t
                    } else {
                        t
                    }
                }
                _ => up,
            };

            let mut dir = match plane_intersection_direction(&e_in.plane, &e_out.plane) {
                Some(d) => d,
                None => e_out.rotated_normal,
            };
            if dir.dot(up) < 0.0 {
                dir = -dir;
            }
            if dir.dot(up) < EPSILON {
                return Err(SkeletonError::accuracy(format!(
                    "horizontal bisector at {id} ({position})"
                )));
            }

            trace!(
                vertex = %id,
                turn = angle_between(e_in.direction, e_out.direction),
                "corner"
            );
            let v = &mut self.arena[id];
            v.normal = normal;
            v.bisector = Ray::new(position, e_in.normal + e_out.normal);
            v.rotated_bisector = Ray::new(position, dir);
            v.reflex = is_reflex(e_in.direction, e_out.direction, up);
            v.processed = false;
            v.edge_in = e_in.source;
        }
        Ok(edges)
    }

    /// Every point where a corner's two slope planes meet the slope plane of
    /// another loop edge, inside that edge's swept region and above the
    /// current wavefront.
    pub(super) fn candidates(&self, polygon: &Polygon, edges: &[Edge]) -> Vec<Candidate> {
        let n = polygon.len();
        let base = polygon.plane.point;
        let mut out = Vec::new();

        for i in 0..n {
            let id = polygon.vertices[i];
            let vertex = &self.arena[id];
            let prev_edge = (i + n - 1) % n;
            let e_in = &edges[prev_edge];
            let e_out = &edges[i];

            for (j, target) in edges.iter().enumerate() {
                if j == prev_edge || j == i {
                    continue;
                }
                let Some(x) =
                    three_plane_intersection(&e_in.plane, &e_out.plane, &target.plane)
                else {
                    continue;
                };
                let distance = (x - base).dot(self.up);
                if distance <= ON_LOCUS || !self.in_swept_region(target, x) {
                    continue;
                }

                let partner = if j == (i + 1) % n {
                    Some(target.start)
                } else if j == (i + n - 2) % n {
                    Some(target.end)
                } else {
                    None
                };
                trace!(trigger = %id, edge = j, distance, ?x, reflex = vertex.reflex, "candidate");
                out.push(Candidate {
                    distance,
                    point: x,
                    trigger: id,
                    edge: EdgeRef {
                        start: target.start,
                        end: target.end,
                        source: target.source,
                    },
                    partner,
                    reflex: vertex.reflex,
                });
            }
        }
        out
    }

    /// The region swept by `edge` is bounded by its two corner bisectors and
    /// by the edge line itself.
    fn in_swept_region(&self, edge: &Edge, x: DVec3) -> bool {
        let a = &self.arena[edge.start];
        let b = &self.arena[edge.end];
        let up = self.up;

        let ray_a = locus_ray(a, edge, up);
        let ray_b = locus_ray(b, edge, up);
        let along = Ray {
            origin: a.position,
            direction: edge.direction,
        };
        same_side_of_ray(&ray_a, x, b.position, up, ON_LOCUS)
            && same_side_of_ray(&ray_b, x, a.position, up, ON_LOCUS)
            && same_side_of_ray(&along, x, a.position + edge.normal, up, ON_LOCUS)
    }
}

/// Ray traced by a corner as seen from above. A corner rising straight up
/// has no horizontal direction; the edge's inward normal stands in for it.
fn locus_ray(v: &Vertex, edge: &Edge, up: DVec3) -> Ray {
    match v.rotated_bisector {
        Some(r) if (r.direction - up * r.direction.dot(up)).length() > EPSILON => r,
        _ => Ray {
            origin: v.position,
            direction: edge.normal,
        },
    }
}
