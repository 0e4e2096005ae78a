// Copyright 2025 Lars Brubaker
// License: MIT
//
// Weighted straight skeleton driver.
//
// The footprint is shrunk as a wavefront: every slope plane rises inward at
// the pitch of its edge weight and the wavefront is the horizontal cut through
// those planes at the current height. Each iteration finds the nearest height
// at which the wavefront topology changes, moves every corner up to that
// height, rewires the loop, and queues what is left. Sub-loops produced by a
// split are queued independently. When the work-list is empty the recorded
// vertex history is walked into one face per footprint edge.

mod faces;
mod iteration;
mod rewire;
#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use glam::DVec3;
use tracing::{debug, info, instrument, warn};

pub use faces::RoofFace;

use crate::config::SkeletonConfig;
use crate::error::{Result, SkeletonError};
use crate::event::{self, EventKind, EventRecord};
use crate::geom::newell_normal;
use crate::polygon::{extract_cycles, Polygon};
use crate::tolerance::{EVENT_BAND, ON_LOCUS, PLANARITY};
use crate::vertex::{Vertex, VertexArena, VertexId};
use crate::virtual_edge::{VirtualEdge, VirtualEdgeChain};
use crate::weights::{check_weight, EdgeWeight, EdgeWeights, SlopePhase};

// ─────────────────────────────── Input ─────────────────────────────────────────

/// A simple planar building outline with one weight per edge. Edge `i` runs
/// from point `i` to point `i + 1`.
#[derive(Clone, Debug)]
pub struct Footprint {
    points: Vec<DVec3>,
    weights: Vec<EdgeWeight>,
    direction: DVec3,
}

impl Footprint {
    /// `direction` is the build direction (the roof rises along it). Either
    /// winding is accepted.
    pub fn new(points: Vec<DVec3>, weights: Vec<EdgeWeight>, direction: DVec3) -> Result<Self> {
        let n = points.len();
        if n < 3 {
            return Err(SkeletonError::input(format!("need at least 3 points, got {n}")));
        }
        if weights.len() != n {
            return Err(SkeletonError::input(format!(
                "{} weights for {n} edges",
                weights.len()
            )));
        }
        if !direction.is_finite() {
            return Err(SkeletonError::input("build direction is not finite"));
        }
        let up = direction
            .try_normalize()
            .ok_or_else(|| SkeletonError::input("build direction has zero length"))?;
        for (i, p) in points.iter().enumerate() {
            if !p.is_finite() {
                return Err(SkeletonError::input(format!("point {i} is not finite")));
            }
            if p.distance(points[(i + 1) % n]) < ON_LOCUS {
                let j = (i + 1) % n;
                return Err(SkeletonError::input(format!("points {i} and {j} coincide")));
            }
            let off = (*p - points[0]).dot(up);
            if off.abs() > PLANARITY {
                return Err(SkeletonError::input(format!(
                    "point {i} is {off} off the footprint plane"
                )));
            }
        }
        for (i, w) in weights.iter().enumerate() {
            check_weight(w.value, &format!("weight of edge {i}"))?;
        }
        if newell_normal(&points).dot(up).abs() < ON_LOCUS {
            return Err(SkeletonError::input("footprint has zero area"));
        }
        Ok(Footprint { points, weights, direction: up })
    }

    /// Same weight on every edge, all tagged Main.
    pub fn uniform(points: Vec<DVec3>, weight: f64, direction: DVec3) -> Result<Self> {
        let weights = vec![EdgeWeight::main(weight); points.len()];
        Footprint::new(points, weights, direction)
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn weights(&self) -> &[EdgeWeight] {
        &self.weights
    }

    /// Unit build direction.
    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Clockwise when seen from the tip of the build direction.
    pub fn is_clockwise(&self) -> bool {
        newell_normal(&self.points).dot(self.direction) < 0.0
    }
}

// ─────────────────────────────── Output ────────────────────────────────────────

/// What one shrink step did.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct IterationRecord {
    /// Shrink depth of the wavefront lineage.
    pub depth: usize,
    /// Height of the wavefront before the step.
    pub height: f64,
    /// Height gained by the step.
    pub distance: f64,
    pub events: Vec<EventRecord>,
    /// Wavefront loops queued for the next step.
    pub polygons: usize,
}

/// Completed skeleton of one footprint.
#[derive(Clone, Debug)]
pub struct RoofSkeleton {
    faces: Vec<RoofFace>,
    chains: Vec<VirtualEdgeChain>,
    arena: VertexArena,
    iterations: Vec<IterationRecord>,
    footprint: Vec<VertexId>,
    slope_change_applied: bool,
    up: DVec3,
    origin: DVec3,
}

impl RoofSkeleton {
    pub fn faces(&self) -> &[RoofFace] {
        &self.faces
    }

    /// Ordered vertex chains of the footprint edges that lost a vertex to
    /// degeneracy removal during the run.
    pub fn virtual_edges(&self) -> &[VirtualEdgeChain] {
        &self.chains
    }

    pub fn vertices(&self) -> &VertexArena {
        &self.arena
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.arena.get(id)
    }

    /// Footprint corners in working (counter-clockwise) order.
    pub fn footprint_vertices(&self) -> &[VertexId] {
        &self.footprint
    }

    pub fn iterations(&self) -> &[IterationRecord] {
        &self.iterations
    }

    pub fn event_count(&self, kind: EventKind) -> usize {
        self.iterations
            .iter()
            .flat_map(|r| r.events.iter())
            .filter(|e| e.kind == kind)
            .count()
    }

    /// Height of `p` above the footprint plane.
    pub fn height_of(&self, p: DVec3) -> f64 {
        (p - self.origin).dot(self.up)
    }

    /// Highest point reached by any skeleton vertex.
    pub fn apex_height(&self) -> f64 {
        self.arena
            .iter()
            .map(|v| self.height_of(v.position))
            .fold(0.0, f64::max)
    }

    pub fn slope_change_applied(&self) -> bool {
        self.slope_change_applied
    }

    pub fn faces_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.faces)?)
    }
}

// ─────────────────────────── Skeleton ──────────────────────────────────────────

/// Entry point: holds the run configuration and builds skeletons.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    config: SkeletonConfig,
}

impl Skeleton {
    pub fn new(config: SkeletonConfig) -> Result<Self> {
        config.validate()?;
        Ok(Skeleton { config })
    }

    pub fn config(&self) -> &SkeletonConfig {
        &self.config
    }

    /// Skeletonize one footprint. Any failure aborts the whole run.
    #[instrument(skip_all, fields(points = footprint.len()))]
    pub fn build(&self, footprint: &Footprint) -> Result<RoofSkeleton> {
        let mut builder = SkeletonBuilder::new(&self.config, footprint);
        builder.seed()?;
        while let Some(task) = builder.work.pop_front() {
            builder.run_task(task)?;
        }
        let faces = builder.reconstruct_faces()?;
        info!(
            iterations = builder.iterations.len(),
            faces = faces.len(),
            vertices = builder.arena.len(),
            "skeleton complete"
        );
        Ok(builder.finish(faces))
    }
}

// ─────────────────────────── Run state ─────────────────────────────────────────

/// One pending shrink step of one wavefront loop.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Task {
    pub start: VertexId,
    pub depth: usize,
    pub phase: SlopePhase,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum CapKind {
    /// The footprint edge itself.
    Footprint,
    /// Wavefront edge at the mansard slope change.
    Boundary,
    /// Wavefront edge left when a loop stops shrinking.
    Final,
    /// Edge closed off by degeneracy removal.
    Collapsed,
}

/// A face boundary segment that is not a vertex trajectory.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct CapSegment {
    pub from: VertexId,
    pub to: VertexId,
    pub edge: usize,
    pub phase: SlopePhase,
    pub kind: CapKind,
}

pub(crate) struct SkeletonBuilder<'a> {
    config: &'a SkeletonConfig,
    up: DVec3,
    origin: DVec3,
    points: Vec<DVec3>,
    /// Working edge index -> caller edge index.
    edge_map: Vec<usize>,
    weights: EdgeWeights,
    pub(crate) arena: VertexArena,
    ledger: Vec<VirtualEdge>,
    caps: Vec<CapSegment>,
    iterations: Vec<IterationRecord>,
    work: VecDeque<Task>,
    footprint: Vec<VertexId>,
    slope_change_applied: bool,
}

impl<'a> SkeletonBuilder<'a> {
    /// Scale about the centroid and bring the outline into counter-clockwise
    /// order. A reversed outline's working edge `i` is caller edge `n - 2 - i`.
    pub(crate) fn new(config: &'a SkeletonConfig, footprint: &Footprint) -> Self {
        let n = footprint.len();
        let up = footprint.direction();
        let centroid = footprint.points().iter().copied().sum::<DVec3>() / n as f64;
        let scaled: Vec<DVec3> = footprint
            .points()
            .iter()
            .map(|p| centroid + (*p - centroid) * config.footprint_scale)
            .collect();

        let (points, edge_map): (Vec<DVec3>, Vec<usize>) = if footprint.is_clockwise() {
            debug!("clockwise footprint, reversing");
            let pts = scaled.iter().rev().copied().collect();
            let map = (0..n).map(|i| (2 * n - 2 - i) % n).collect();
            (pts, map)
        } else {
            (scaled, (0..n).collect())
        };

        let directions: Vec<DVec3> = (0..n)
            .map(|i| {
                let d = points[(i + 1) % n] - points[i];
                (d - up * d.dot(up)).normalize_or_zero()
            })
            .collect();
        let weights: Vec<EdgeWeight> = edge_map.iter().map(|&j| footprint.weights()[j]).collect();

        SkeletonBuilder {
            config,
            up,
            origin: points[0],
            edge_map,
            weights: EdgeWeights::new(&weights, &directions, config.mansard),
            arena: VertexArena::new(),
            ledger: Vec::with_capacity(n),
            caps: Vec::new(),
            iterations: Vec::new(),
            work: VecDeque::new(),
            footprint: Vec::with_capacity(n),
            slope_change_applied: false,
            points,
        }
    }

    /// Allocate the footprint loop and queue the first task.
    pub(crate) fn seed(&mut self) -> Result<()> {
        let n = self.points.len();
        for i in 0..n {
            let id = self.arena.alloc(self.points[i], self.up, SlopePhase::Lower);
            let v = &mut self.arena[id];
            v.edge_in = (i + n - 1) % n;
            v.edge_out = i;
            self.footprint.push(id);
        }
        for i in 0..n {
            let (a, b) = (self.footprint[i], self.footprint[(i + 1) % n]);
            self.arena.link(a, b);
            let mut ledger = VirtualEdge::new(i, self.points[i], self.weights.direction(i));
            ledger.insert(a, self.points[i]);
            ledger.insert(b, self.points[(i + 1) % n]);
            self.ledger.push(ledger);
            self.caps.push(CapSegment {
                from: a,
                to: b,
                edge: i,
                phase: SlopePhase::Lower,
                kind: CapKind::Footprint,
            });
        }
        self.work.push_back(Task {
            start: self.footprint[0],
            depth: 0,
            phase: SlopePhase::Lower,
        });
        Ok(())
    }

    #[inline]
    fn height_of(&self, p: DVec3) -> f64 {
        (p - self.origin).dot(self.up)
    }

    /// Mansard height still ahead of a wavefront at `height`, if any. The
    /// change fires once per run; loops split off before it stay on the
    /// lower weights.
    fn slope_change_height(&self, phase: SlopePhase, height: f64) -> Option<f64> {
        if self.slope_change_applied {
            return None;
        }
        let m = self.weights.mansard()?;
        (phase == SlopePhase::Lower && m.height > height + ON_LOCUS).then_some(m.height)
    }

    /// One shrink step: ComputeEvents -> Classify -> Shrink -> Rewire ->
    /// Terminate or requeue.
    pub(crate) fn run_task(&mut self, task: Task) -> Result<()> {
        let polygon = Polygon::from_links(&self.arena, task.start, self.up)?;
        let height = self.height_of(polygon.plane.point);

        if polygon.len() <= 2 {
            self.cap_loop(&polygon, task.phase);
            return Ok(());
        }
        if task.depth >= self.config.max_iteration_depth {
            warn!(depth = task.depth, height, "iteration depth limit reached");
            self.cap_loop(&polygon, task.phase);
            return Ok(());
        }

        let edges = self.finalize(&polygon, task.phase)?;
        let selected = event::select_nearest(self.candidates(&polygon, &edges));
        let nearest = selected.first().map(|c| c.distance);

        if let Some(h) = self.slope_change_height(task.phase, height) {
            let needed = h - height;
            if nearest.map_or(true, |d| d >= needed - EVENT_BAND) {
                return self.change_slope(&polygon, task, height, needed);
            }
        }

        let Some(distance) = nearest else {
            debug!(depth = task.depth, height, "no events, wavefront stops");
            self.cap_loop(&polygon, task.phase);
            return Ok(());
        };

        let groups = event::classify(selected)?;
        let target = polygon.plane.translated(self.up, distance);
        let outcome = self.shrink_and_rewire(&polygon, &groups, &target, task.phase)?;
        let survivors = self.validate(&outcome.children)?;

        let starts: Vec<VertexId> = if outcome.split {
            let mut starts = Vec::new();
            for cycle in extract_cycles(&self.arena, &survivors) {
                if cycle.len() >= 3 {
                    starts.push(cycle[0]);
                } else if let Ok(stub) = Polygon::from_links(&self.arena, cycle[0], self.up) {
                    self.cap_loop(&stub, task.phase);
                }
            }
            starts
        } else {
            survivors.first().copied().into_iter().collect()
        };

        debug!(
            depth = task.depth,
            height,
            distance,
            groups = groups.len(),
            polygons = starts.len(),
            "iteration"
        );
        self.iterations.push(IterationRecord {
            depth: task.depth,
            height,
            distance,
            events: outcome.records,
            polygons: starts.len(),
        });
        for start in starts {
            self.work.push_back(Task {
                start,
                depth: task.depth + 1,
                phase: task.phase,
            });
        }
        Ok(())
    }

    /// Close a loop that stops shrinking: its edges become face boundaries.
    fn cap_loop(&mut self, polygon: &Polygon, phase: SlopePhase) {
        for &u in &polygon.vertices {
            let v = &self.arena[u];
            if let Some(next) = v.next() {
                if next != u {
                    self.caps.push(CapSegment {
                        from: u,
                        to: next,
                        edge: v.edge_out,
                        phase,
                        kind: CapKind::Final,
                    });
                }
            }
        }
        for &u in &polygon.vertices {
            self.arena[u].active = false;
        }
    }

    fn finish(self, faces: Vec<RoofFace>) -> RoofSkeleton {
        let chains = self
            .ledger
            .iter()
            .filter(|l| l.degenerated())
            .map(|l| {
                let mut chain = l.chain();
                chain.edge = self.edge_map[chain.edge];
                chain
            })
            .collect();
        RoofSkeleton {
            faces,
            chains,
            arena: self.arena,
            iterations: self.iterations,
            footprint: self.footprint,
            slope_change_applied: self.slope_change_applied,
            up: self.up,
            origin: self.origin,
        }
    }
}
