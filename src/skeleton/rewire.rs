// Copyright 2025 Lars Brubaker
// License: MIT
//
// Shrinking the wavefront and relinking it.
//
// The old loop is read as a token stream: every corner in order, with the
// split children that land on an edge inserted right after the edge's start
// corner (in the order the virtual-edge ledger gives them). Consecutive
// tokens resolved by the same event group form a run. A group reached by k
// separate runs produces k coincident twin children; run i enters through
// child i and leaves through child i+1, which is exactly what separates the
// loop into sub-loops at a split or vertex event.

use std::collections::HashMap;

use glam::DVec3;
use tracing::{info, trace, warn};

use super::{CapKind, CapSegment, IterationRecord, SkeletonBuilder, Task};
use crate::error::{Result, SkeletonError};
use crate::event::{Event, EventGroup, EventRecord};
use crate::geom::{distance_to_segment, ray_plane_intersection, round_point, Plane};
use crate::polygon::Polygon;
use crate::tolerance::COLINEAR;
use crate::vertex::{VertexId, NEXT, PREV};
use crate::weights::SlopePhase;

pub(super) struct RewireOutcome {
    /// The new wavefront vertices, in old loop order.
    pub children: Vec<VertexId>,
    /// Some group was reached by more than one run.
    pub split: bool,
    pub records: Vec<EventRecord>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Token {
    Corner(VertexId),
    /// Split child placed on the edge leaving the preceding corner.
    Pseudo { child: VertexId, source: usize },
}

struct Unit {
    group: Option<usize>,
    tokens: Vec<Token>,
}

impl<'a> SkeletonBuilder<'a> {
    /// Child of `v` where its rotated bisector meets `target`.
    fn plain_child(&mut self, v: VertexId, target: &Plane, phase: SlopePhase) -> Result<VertexId> {
        let ray = self.arena[v]
            .rotated_bisector
            .ok_or_else(|| SkeletonError::accuracy(format!("vertex {v} has no bisector")))?;
        let p = ray_plane_intersection(&ray, target).ok_or_else(|| {
            SkeletonError::accuracy(format!("bisector of {v} misses the wavefront plane"))
        })?;
        let edge_out = self.arena[v].edge_out;
        let c = self.arena.alloc(p, self.up, phase);
        let child = &mut self.arena[c];
        child.parent = Some(v);
        child.edge_out = edge_out;
        self.arena[v].child = Some(c);
        Ok(c)
    }

    /// Child shared by every token of an event run. A run holding a split
    /// child reuses it.
    fn run_child(&mut self, unit: &Unit, point: DVec3, phase: SlopePhase) -> VertexId {
        let pseudo: Vec<VertexId> = unit
            .tokens
            .iter()
            .filter_map(|t| match t {
                Token::Pseudo { child, .. } => Some(*child),
                Token::Corner(_) => None,
            })
            .collect();
        if let Some((&c, rest)) = pseudo.split_first() {
            for &extra in rest {
                self.arena[extra].active = false;
                self.arena[extra].twin = Some(c);
            }
            return c;
        }
        let parent = unit.tokens.iter().find_map(|t| match t {
            Token::Corner(v) => Some(*v),
            Token::Pseudo { .. } => None,
        });
        let c = self.arena.alloc(point, self.up, phase);
        let child = &mut self.arena[c];
        child.parent = parent;
        child.skeleton_node = true;
        c
    }

    /// Footprint edge of the wavefront edge leaving a run.
    fn unit_out_edge(&self, unit: &Unit) -> usize {
        match unit.tokens.last() {
            Some(Token::Corner(v)) => self.arena[*v].edge_out,
            Some(Token::Pseudo { source, .. }) => *source,
            None => 0,
        }
    }

    pub(super) fn shrink_and_rewire(
        &mut self,
        polygon: &Polygon,
        groups: &[EventGroup],
        target: &Plane,
        phase: SlopePhase,
    ) -> Result<RewireOutcome> {
        let points: Vec<DVec3> = groups.iter().map(|g| target.project(g.point)).collect();

        let mut group_of: HashMap<VertexId, usize> = HashMap::new();
        for (gi, g) in groups.iter().enumerate() {
            for &v in g.arrivals.iter().chain(g.splits.iter().map(|(t, _)| t)) {
                let slot = group_of.entry(v).or_insert(gi);
                if *slot != gi {
                    warn!(vertex = %v, "vertex reaches two event points, keeping the first");
                }
            }
        }

        // Split children, registered on the footprint edge they land on.
        let mut pseudo_on: HashMap<VertexId, Vec<(VertexId, usize)>> = HashMap::new();
        for (gi, g) in groups.iter().enumerate() {
            for &(trigger, edge) in &g.splits {
                let c = self.arena.alloc(points[gi], self.up, phase);
                let child = &mut self.arena[c];
                child.parent = Some(trigger);
                child.skeleton_node = true;
                self.ledger[edge.source].insert(c, points[gi]);
                pseudo_on.entry(edge.start).or_default().push((c, gi));
                trace!(trigger = %trigger, child = %c, edge = edge.source, "split child");
            }
        }

        let mut tokens: Vec<(Token, Option<usize>)> = Vec::with_capacity(polygon.len());
        for &v in &polygon.vertices {
            tokens.push((Token::Corner(v), group_of.get(&v).copied()));
            if let Some(list) = pseudo_on.get(&v) {
                let source = self.arena[v].edge_out;
                for recorded in self.ledger[source].iter() {
                    if let Some(&(child, gi)) = list.iter().find(|(c, _)| *c == recorded.vertex) {
                        tokens.push((Token::Pseudo { child, source }, Some(gi)));
                    }
                }
            }
        }

        // Start the stream on a run boundary so no run wraps around.
        let len = tokens.len();
        let single = tokens.iter().all(|t| t.1.is_some() && t.1 == tokens[0].1);
        if !single {
            let start = (0..len)
                .find(|&i| tokens[i].1.is_none() || tokens[i].1 != tokens[(i + len - 1) % len].1)
                .unwrap_or(0);
            tokens.rotate_left(start);
        }

        let mut units: Vec<Unit> = Vec::new();
        for (token, group) in tokens {
            match units.last_mut() {
                Some(u) if group.is_some() && u.group == group => u.tokens.push(token),
                _ => units.push(Unit { group, tokens: vec![token] }),
            }
        }

        let mut entry: Vec<Option<VertexId>> = vec![None; units.len()];
        let mut exit: Vec<Option<VertexId>> = vec![None; units.len()];

        for (ui, unit) in units.iter().enumerate() {
            if unit.group.is_none() {
                if let Some(Token::Corner(v)) = unit.tokens.first() {
                    let c = self.plain_child(*v, target, phase)?;
                    entry[ui] = Some(c);
                    exit[ui] = Some(c);
                }
            }
        }

        let mut runs: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
        for (ui, unit) in units.iter().enumerate() {
            if let Some(g) = unit.group {
                runs[g].push(ui);
            }
        }

        let mut split = false;
        let mut records: Vec<EventRecord> = groups.iter().map(EventGroup::record).collect();
        for (gi, group_runs) in runs.iter().enumerate() {
            let k = group_runs.len();
            if k == 0 {
                continue;
            }
            let kids: Vec<VertexId> = group_runs
                .iter()
                .map(|&ui| self.run_child(&units[ui], points[gi], phase))
                .collect();
            for (r, &ui) in group_runs.iter().enumerate() {
                entry[ui] = Some(kids[r]);
                exit[ui] = Some(kids[(r + 1) % k]);
                let out = self.unit_out_edge(&units[group_runs[(r + k - 1) % k]]);
                self.arena[kids[r]].edge_out = out;
            }
            if k >= 2 {
                split = true;
                self.arena.make_twins(kids[0], kids[1]);
                for &c in &kids[2..] {
                    self.arena[c].twin = Some(kids[0]);
                }
            }
            trace!(kind = ?groups[gi].kind, point = ?points[gi], runs = k, "event resolved");
            records[gi].children = kids;
        }

        let m = units.len();
        for ui in 0..m {
            let (Some(x), Some(y)) = (exit[ui], entry[(ui + 1) % m]) else {
                return Err(SkeletonError::accuracy("wavefront run without a child"));
            };
            self.arena.link(x, y);
        }

        // Parents are pointed at their children only now that every link is
        // in place.
        for (ui, unit) in units.iter().enumerate() {
            if unit.group.is_none() {
                continue;
            }
            for token in &unit.tokens {
                if let Token::Corner(v) = token {
                    let parent = &mut self.arena[*v];
                    parent.child = entry[ui];
                    parent.processed = true;
                }
            }
        }

        let mut children: Vec<VertexId> = Vec::with_capacity(m);
        for c in entry.into_iter().flatten() {
            if !children.contains(&c) {
                children.push(c);
            }
        }
        Ok(RewireOutcome { children, split, records })
    }

    /// Drop collapsed and colinear vertices from the new loops, then check
    /// and repair link symmetry. Returns the surviving vertices.
    pub(super) fn validate(&mut self, children: &[VertexId]) -> Result<Vec<VertexId>> {
        loop {
            let mut changed = false;
            for &x in children {
                if !self.arena[x].active {
                    continue;
                }
                let (Some(n), Some(p)) = (self.arena[x].next(), self.arena[x].prev()) else {
                    return Err(SkeletonError::accuracy(format!("vertex {x} lost a neighbour")));
                };
                let phase = self.arena[x].phase;
                if n == x {
                    self.arena[x].active = false;
                    changed = true;
                    continue;
                }
                if n == p {
                    let (x_out, n_out) = (self.arena[x].edge_out, self.arena[n].edge_out);
                    self.push_cap(x, n, x_out, phase);
                    self.push_cap(n, x, n_out, phase);
                    self.arena[x].active = false;
                    self.arena[n].active = false;
                    changed = true;
                    continue;
                }
                let xp = self.arena.position(x);
                let (pp, np) = (self.arena.position(p), self.arena.position(n));
                if distance_to_segment(xp, pp, np) <= COLINEAR {
                    let (x_out, p_out) = (self.arena[x].edge_out, self.arena[p].edge_out);
                    warn!(vertex = %x, "removing degenerate wavefront vertex");
                    self.ledger[x_out].record_removed(x, xp);
                    self.ledger[p_out].record_removed(x, xp);
                    self.push_cap(x, n, x_out, phase);
                    self.push_cap(x, n, p_out, phase);
                    self.arena.link(p, n);
                    self.arena[x].active = false;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        self.repair_links(children)?;

        let survivors: Vec<VertexId> = children
            .iter()
            .copied()
            .filter(|&x| self.arena[x].active)
            .collect();
        for &x in &survivors {
            if let Some(p) = self.arena[x].prev() {
                self.arena[x].edge_in = self.arena[p].edge_out;
            }
        }
        Ok(survivors)
    }

    fn push_cap(&mut self, from: VertexId, to: VertexId, edge: usize, phase: SlopePhase) {
        self.caps.push(CapSegment {
            from,
            to,
            edge,
            phase,
            kind: CapKind::Collapsed,
        });
    }

    /// Restore `v.next.prev == v` and `v.prev.next == v` where exactly one
    /// vertex claims the missing back reference.
    fn repair_links(&mut self, children: &[VertexId]) -> Result<()> {
        for &x in children {
            if !self.arena[x].active {
                continue;
            }
            if let Some(n) = self.arena[x].next() {
                if self.arena[n].prev() != Some(x) {
                    let claimants = children
                        .iter()
                        .filter(|&&y| self.arena[y].active && self.arena[y].next() == Some(n))
                        .count();
                    if claimants != 1 {
                        return Err(SkeletonError::accuracy(format!(
                            "cannot restore back link {n} -> {x}"
                        )));
                    }
                    warn!(vertex = %n, prev = %x, "repairing back link");
                    self.arena[n].neighbors[PREV] = Some(x);
                }
            }
            if let Some(p) = self.arena[x].prev() {
                if self.arena[p].next() != Some(x) {
                    let claimants = children
                        .iter()
                        .filter(|&&y| self.arena[y].active && self.arena[y].prev() == Some(p))
                        .count();
                    if claimants != 1 {
                        return Err(SkeletonError::accuracy(format!(
                            "cannot restore forward link {p} -> {x}"
                        )));
                    }
                    warn!(vertex = %p, next = %x, "repairing forward link");
                    self.arena[p].neighbors[NEXT] = Some(x);
                }
            }
        }
        Ok(())
    }

    /// Lift the whole loop to the mansard height and continue it with the
    /// upper weights.
    pub(super) fn change_slope(
        &mut self,
        polygon: &Polygon,
        task: Task,
        height: f64,
        distance: f64,
    ) -> Result<()> {
        let target = polygon.plane.translated(self.up, distance);
        let mut children = Vec::with_capacity(polygon.len());
        for &v in &polygon.vertices {
            children.push(self.plain_child(v, &target, SlopePhase::Upper)?);
        }

        let n = children.len();
        for i in 0..n {
            let (a, b) = (children[i], children[(i + 1) % n]);
            self.arena.link(a, b);
            let edge = self.arena[polygon.vertices[i]].edge_out;
            for phase in [SlopePhase::Lower, SlopePhase::Upper] {
                self.caps.push(CapSegment {
                    from: a,
                    to: b,
                    edge,
                    phase,
                    kind: CapKind::Boundary,
                });
            }
        }
        self.slope_change_applied = true;

        let centroid = children.iter().map(|&c| self.arena.position(c)).sum::<DVec3>() / n as f64;
        let event = Event::ChangeSlope {
            distance,
            point: centroid,
            trigger: polygon.vertices[0],
            height: height + distance,
        };
        info!(height = height + distance, depth = task.depth, "slope change");

        let survivors = self.validate(&children)?;
        self.iterations.push(IterationRecord {
            depth: task.depth,
            height,
            distance,
            events: vec![EventRecord {
                kind: event.kind(),
                distance: event.distance(),
                point: round_point(event.point()),
                vertices: polygon.vertices.clone(),
                children,
            }],
            polygons: usize::from(!survivors.is_empty()),
        });
        if let Some(&start) = survivors.first() {
            self.work.push_back(Task {
                start,
                depth: task.depth + 1,
                phase: SlopePhase::Upper,
            });
        }
        Ok(())
    }
}
