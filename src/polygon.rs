// Copyright 2025 Lars Brubaker
// License: MIT

use std::collections::HashSet;

use glam::DVec3;

use crate::error::{Result, SkeletonError};
use crate::geom::Plane;
use crate::vertex::{VertexArena, VertexId};

/// One wavefront loop, re-derived from the neighbour links each iteration.
#[derive(Clone, Debug)]
pub struct Polygon {
    pub vertices: Vec<VertexId>,
    /// Horizontal plane the loop lies in.
    pub plane: Plane,
}

impl Polygon {
    /// Walk slot 0 from `start` until the loop closes.
    pub fn from_links(arena: &VertexArena, start: VertexId, up: DVec3) -> Result<Polygon> {
        let mut vertices = vec![start];
        let mut cur = start;
        loop {
            let v = &arena[cur];
            if !v.active {
                return Err(SkeletonError::accuracy(format!(
                    "inactive vertex {cur} in wavefront loop"
                )));
            }
            let next = v
                .next()
                .ok_or_else(|| SkeletonError::accuracy(format!("vertex {cur} has no successor")))?;
            if next == start {
                break;
            }
            if vertices.len() > arena.len() {
                return Err(SkeletonError::accuracy(format!(
                    "wavefront loop from {start} never closes"
                )));
            }
            vertices.push(next);
            cur = next;
        }
        let plane = Plane::new(arena.position(start), up)
            .ok_or_else(|| SkeletonError::accuracy("zero build direction"))?;
        Ok(Polygon { vertices, plane })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex at loop position `i`, wrapping in both directions.
    #[inline]
    pub fn at(&self, i: isize) -> VertexId {
        let n = self.vertices.len() as isize;
        self.vertices[i.rem_euclid(n) as usize]
    }
}

/// Carve the vertices reachable from `ids` into disjoint cycles by following
/// slot 0 from every not-yet-assigned vertex. A walk that runs into an
/// already assigned vertex or a broken link yields no cycle.
pub fn extract_cycles(arena: &VertexArena, ids: &[VertexId]) -> Vec<Vec<VertexId>> {
    let mut assigned: HashSet<VertexId> = HashSet::new();
    let mut cycles = Vec::new();

    for &start in ids {
        if assigned.contains(&start) || !arena[start].active {
            continue;
        }
        let mut cycle = vec![start];
        assigned.insert(start);
        let mut cur = start;
        let closed = loop {
            match arena[cur].next() {
                Some(n) if n == start => break true,
                Some(n) if !assigned.contains(&n) && arena[n].active => {
                    assigned.insert(n);
                    cycle.push(n);
                    cur = n;
                }
                _ => break false,
            }
        };
        if closed {
            cycles.push(cycle);
        }
    }
    cycles
}
