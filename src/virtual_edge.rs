// Copyright 2025 Lars Brubaker
// License: MIT
//
// Virtual-edge ledger.
//
// Every footprint edge owns a sorted doubly-linked list of the vertices that
// have ever lain along it: its two footprint corners, split children placed
// on it, and degenerate vertices removed from it. Entries are ordered by
// their offset along the footprint edge direction, so walking the list gives
// "the next real neighbour along this edge" even after several events have
// landed on the same edge across iterations.

use glam::DVec3;
use serde::Serialize;

use crate::vertex::VertexId;

/// Index into `VirtualEdge::nodes`.
pub type NodeIdx = u32;

/// Index of the head sentinel node.
pub const LEDGER_HEAD: NodeIdx = 0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LedgerEntry {
    pub vertex: VertexId,
    pub offset: f64,
    pub position: DVec3,
}

#[derive(Clone, Debug)]
struct LedgerNode {
    entry: Option<LedgerEntry>, // None for the sentinel
    next: NodeIdx,
    prev: NodeIdx,
}

/// Ordered ledger for one footprint edge.
// The head sentinel is always at index 0 and the list is circular:
// head.prev == head.next == head when empty.
#[derive(Clone, Debug)]
pub struct VirtualEdge {
    source: usize,
    origin: DVec3,
    direction: DVec3,
    nodes: Vec<LedgerNode>,
    degenerated: bool,
}

impl VirtualEdge {
    pub fn new(source: usize, origin: DVec3, direction: DVec3) -> Self {
        let head = LedgerNode {
            entry: None,
            next: LEDGER_HEAD,
            prev: LEDGER_HEAD,
        };
        VirtualEdge {
            source,
            origin,
            direction,
            nodes: vec![head],
            degenerated: false,
        }
    }

    /// Position of `p` along the footprint edge.
    #[inline]
    pub fn offset_of(&self, p: DVec3) -> f64 {
        (p - self.origin).dot(self.direction)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.min() == LEDGER_HEAD
    }

    /// Insert `vertex` at its sorted position, walking backward from the tail.
    /// Re-inserting a vertex already present is a no-op.
    pub fn insert(&mut self, vertex: VertexId, position: DVec3) -> NodeIdx {
        if let Some(existing) = self.find(vertex) {
            return existing;
        }
        let offset = self.offset_of(position);

        let mut node = LEDGER_HEAD;
        loop {
            node = self.nodes[node as usize].prev;
            match self.nodes[node as usize].entry {
                None => break,
                Some(e) if e.offset <= offset => break,
                Some(_) => {}
            }
        }

        let new_idx = self.nodes.len() as NodeIdx;
        let next_node = self.nodes[node as usize].next;
        self.nodes.push(LedgerNode {
            entry: Some(LedgerEntry { vertex, offset, position }),
            next: next_node,
            prev: node,
        });
        self.nodes[node as usize].next = new_idx;
        self.nodes[next_node as usize].prev = new_idx;
        new_idx
    }

    /// Record a vertex removed as degenerate from a wavefront edge deriving
    /// from this footprint edge.
    pub fn record_removed(&mut self, vertex: VertexId, position: DVec3) {
        self.insert(vertex, position);
        self.degenerated = true;
    }

    /// True once a degenerate vertex was recorded here.
    pub fn degenerated(&self) -> bool {
        self.degenerated
    }

    #[inline]
    pub fn entry(&self, node: NodeIdx) -> Option<&LedgerEntry> {
        self.nodes[node as usize].entry.as_ref()
    }

    #[inline]
    pub fn min(&self) -> NodeIdx {
        self.nodes[LEDGER_HEAD as usize].next
    }

    #[inline]
    pub fn succ(&self, node: NodeIdx) -> NodeIdx {
        self.nodes[node as usize].next
    }

    fn find(&self, vertex: VertexId) -> Option<NodeIdx> {
        let mut node = self.min();
        while node != LEDGER_HEAD {
            if self.nodes[node as usize].entry.map(|e| e.vertex) == Some(vertex) {
                return Some(node);
            }
            node = self.succ(node);
        }
        None
    }

    /// Entries in ascending offset order.
    pub fn iter(&self) -> LedgerIter<'_> {
        LedgerIter {
            edge: self,
            node: self.min(),
        }
    }

    pub fn chain(&self) -> VirtualEdgeChain {
        VirtualEdgeChain {
            edge: self.source,
            vertices: self.iter().map(|e| e.vertex).collect(),
            points: self.iter().map(|e| e.position).collect(),
        }
    }
}

pub struct LedgerIter<'a> {
    edge: &'a VirtualEdge,
    node: NodeIdx,
}

impl<'a> Iterator for LedgerIter<'a> {
    type Item = &'a LedgerEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.edge.entry(self.node)?;
        self.node = self.edge.succ(self.node);
        Some(entry)
    }
}

/// The ordered vertices recorded along one footprint edge, reported to callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VirtualEdgeChain {
    pub edge: usize,
    pub vertices: Vec<VertexId>,
    pub points: Vec<DVec3>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> VirtualEdge {
        VirtualEdge::new(0, DVec3::ZERO, DVec3::X)
    }

    fn at(x: f64) -> DVec3 {
        DVec3::new(x, 0.0, 0.0)
    }

    #[test]
    fn empty_ledger() {
        let e = edge();
        assert!(e.is_empty());
        assert_eq!(e.min(), LEDGER_HEAD);
        assert_eq!(e.iter().count(), 0);
    }

    #[test]
    fn insert_keeps_offset_order() {
        let mut e = edge();
        e.insert(VertexId(3), at(3.0));
        e.insert(VertexId(1), at(1.0));
        e.insert(VertexId(2), at(2.0));
        let order: Vec<u32> = e.iter().map(|x| x.vertex.0).collect();
        assert_eq!(order, vec![1, 2, 3]);
        let first = e.min();
        assert_eq!(e.entry(e.succ(first)).map(|x| x.vertex), Some(VertexId(2)));
    }

    #[test]
    fn reinsert_is_noop() {
        let mut e = edge();
        let a = e.insert(VertexId(7), at(1.0));
        let b = e.insert(VertexId(7), at(5.0));
        assert_eq!(a, b);
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn removal_marks_edge_degenerated() {
        let mut e = edge();
        e.insert(VertexId(0), at(0.0));
        assert!(!e.degenerated());
        e.record_removed(VertexId(4), at(0.5));
        assert!(e.degenerated());
        assert_eq!(e.chain().vertices, vec![VertexId(0), VertexId(4)]);
    }
}
