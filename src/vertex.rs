// Copyright 2025 Lars Brubaker
// License: MIT
//
// Skeleton vertices live in one append-only arena for the whole run.
// All links between them (neighbours, twin, parent, child) are ids into
// that arena, never references, so the cyclic wavefront graph can be
// rewired freely.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::geom::Ray;
use crate::weights::SlopePhase;

/// Index into [`VertexArena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Neighbour slot 0: the next vertex walking the wavefront counter-clockwise.
pub const NEXT: usize = 0;
/// Neighbour slot 1: the previous vertex.
pub const PREV: usize = 1;

#[derive(Clone, Debug)]
pub struct Vertex {
    pub id: VertexId,
    /// Fixed at creation.
    pub position: DVec3,
    /// Wavefront normal at this corner, aligned with the build direction.
    pub normal: DVec3,
    /// Flat angle bisector pointing into the wavefront.
    pub bisector: Option<Ray>,
    /// True shrink direction: the line shared by the two adjacent slope planes.
    pub rotated_bisector: Option<Ray>,
    pub reflex: bool,
    /// Set once the vertex has been resolved for the current shrink step.
    pub processed: bool,
    /// Created by an event rather than by plain shrinking or as input.
    pub skeleton_node: bool,
    /// Still part of a live wavefront loop.
    pub active: bool,
    pub neighbors: [Option<VertexId>; 2],
    pub twin: Option<VertexId>,
    pub parent: Option<VertexId>,
    pub child: Option<VertexId>,
    /// Footprint edge index the incoming wavefront edge derives from.
    pub edge_in: usize,
    /// Footprint edge index the outgoing wavefront edge derives from.
    pub edge_out: usize,
    pub phase: SlopePhase,
}

impl Vertex {
    #[inline]
    pub fn next(&self) -> Option<VertexId> {
        self.neighbors[NEXT]
    }

    #[inline]
    pub fn prev(&self) -> Option<VertexId> {
        self.neighbors[PREV]
    }
}

/// Append-only vertex storage. Ids handed out stay valid for the arena's lifetime.
#[derive(Clone, Debug, Default)]
pub struct VertexArena {
    vertices: Vec<Vertex>,
}

impl VertexArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh active vertex at `position` with no links.
    pub fn alloc(&mut self, position: DVec3, normal: DVec3, phase: SlopePhase) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            id,
            position,
            normal,
            bisector: None,
            rotated_bisector: None,
            reflex: false,
            processed: false,
            skeleton_node: false,
            active: true,
            neighbors: [None, None],
            twin: None,
            parent: None,
            child: None,
            edge_in: 0,
            edge_out: 0,
            phase,
        });
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn get(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    #[inline]
    pub fn position(&self, id: VertexId) -> DVec3 {
        self[id].position
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// Link `a -> b` in both directions.
    pub fn link(&mut self, a: VertexId, b: VertexId) {
        self[a].neighbors[NEXT] = Some(b);
        self[b].neighbors[PREV] = Some(a);
    }

    /// Pair two coincident vertices as twins.
    pub fn make_twins(&mut self, a: VertexId, b: VertexId) {
        self[a].twin = Some(b);
        if self[b].twin.is_none() {
            self[b].twin = Some(a);
        }
    }

    /// One id per coincident twin group: the smallest id reachable through
    /// the twin links.
    pub fn canonical(&self, id: VertexId) -> VertexId {
        let mut best = id;
        let mut seen = vec![id];
        let mut cur = id;
        while let Some(t) = self[cur].twin {
            if seen.contains(&t) {
                break;
            }
            seen.push(t);
            best = best.min(t);
            cur = t;
        }
        best
    }
}

impl std::ops::Index<VertexId> for VertexArena {
    type Output = Vertex;

    fn index(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }
}

impl std::ops::IndexMut<VertexId> for VertexArena {
    fn index_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id.index()]
    }
}
