// Copyright 2025 Lars Brubaker
// License: MIT
//
// Wavefront events and their selection.
//
// One iteration produces a flat list of candidates (a vertex's bisector
// reaching some edge's slope plane). `classify` keeps the ones happening
// "now", merges coincident points into groups, and decides per group whether
// it is a plain collapse, a split or a vertex event.

use std::collections::HashSet;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkeletonError};
use crate::geom::round_point;
use crate::tolerance::{self, EVENT_BAND, MERGE_RADIUS};
use crate::vertex::VertexId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Intersection,
    Split,
    Vertex,
    ChangeSlope,
}

/// The wavefront edge an event lands on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EdgeRef {
    pub start: VertexId,
    pub end: VertexId,
    pub source: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// An edge between `trigger` and `neighbour` shrinks to nothing.
    Intersection {
        distance: f64,
        point: DVec3,
        trigger: VertexId,
        neighbour: VertexId,
    },
    /// A reflex `trigger` runs into the interior of a non-adjacent edge.
    Split {
        distance: f64,
        point: DVec3,
        trigger: VertexId,
        edge: EdgeRef,
    },
    /// Two or more reflex vertices meet at one point.
    Vertex {
        distance: f64,
        point: DVec3,
        triggers: Vec<VertexId>,
        edges: Vec<EdgeRef>,
    },
    /// The wavefront reaches the mansard height.
    ChangeSlope {
        distance: f64,
        point: DVec3,
        trigger: VertexId,
        height: f64,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Intersection { .. } => EventKind::Intersection,
            Event::Split { .. } => EventKind::Split,
            Event::Vertex { .. } => EventKind::Vertex,
            Event::ChangeSlope { .. } => EventKind::ChangeSlope,
        }
    }

    pub fn distance(&self) -> f64 {
        match self {
            Event::Intersection { distance, .. }
            | Event::Split { distance, .. }
            | Event::Vertex { distance, .. }
            | Event::ChangeSlope { distance, .. } => *distance,
        }
    }

    pub fn point(&self) -> DVec3 {
        match self {
            Event::Intersection { point, .. }
            | Event::Split { point, .. }
            | Event::Vertex { point, .. }
            | Event::ChangeSlope { point, .. } => *point,
        }
    }
}

/// A raw event found by intersecting a vertex's two slope planes with a
/// third edge's plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Candidate {
    pub distance: f64,
    pub point: DVec3,
    pub trigger: VertexId,
    pub edge: EdgeRef,
    /// The adjacent vertex sharing the collapsing edge, if `edge` is the
    /// edge right after or right before the trigger's own edges.
    pub partner: Option<VertexId>,
    pub reflex: bool,
}

impl Candidate {
    /// Only edge collapses next to the trigger and reflex-triggered events
    /// can happen.
    pub fn is_relevant(&self) -> bool {
        self.partner.is_some() || self.reflex
    }

    fn into_event(self, point: DVec3) -> Event {
        match self.partner {
            Some(neighbour) => Event::Intersection {
                distance: self.distance,
                point,
                trigger: self.trigger,
                neighbour,
            },
            None => Event::Split {
                distance: self.distance,
                point,
                trigger: self.trigger,
                edge: self.edge,
            },
        }
    }
}

/// All events resolved at one merged point.
#[derive(Clone, Debug)]
pub struct EventGroup {
    pub kind: EventKind,
    pub point: DVec3,
    pub distance: f64,
    /// Vertices whose wavefront corner ends at `point`.
    pub arrivals: Vec<VertexId>,
    /// Split triggers with the edge each one splits. Empty for collapses and
    /// vertex events.
    pub splits: Vec<(VertexId, EdgeRef)>,
    pub events: Vec<Event>,
}

impl EventGroup {
    pub fn record(&self) -> EventRecord {
        let mut vertices = self.arrivals.clone();
        for (t, _) in &self.splits {
            if !vertices.contains(t) {
                vertices.push(*t);
            }
        }
        EventRecord {
            kind: self.kind,
            distance: self.distance,
            point: round_point(self.point),
            vertices,
            children: Vec::new(),
        }
    }
}

/// What an iteration reports about one resolved event group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventRecord {
    pub kind: EventKind,
    pub distance: f64,
    pub point: DVec3,
    pub vertices: Vec<VertexId>,
    pub children: Vec<VertexId>,
}

/// Candidates within [`EVENT_BAND`] of the smallest distance, nearest first.
pub fn select_nearest(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.retain(Candidate::is_relevant);
    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    let Some(min) = candidates.first().map(|c| c.distance) else {
        return candidates;
    };
    candidates.retain(|c| tolerance::approx_eq(c.distance, min, EVENT_BAND));
    candidates
}

/// Turn the selected candidates into event groups, one per merged point.
pub fn classify(candidates: Vec<Candidate>) -> Result<Vec<EventGroup>> {
    let points: Vec<DVec3> = candidates.iter().map(|c| c.point).collect();
    let (merged, assignment) = tolerance::merge_points(&points, MERGE_RADIUS);

    let mut groups = Vec::with_capacity(merged.len());
    for (gi, &point) in merged.iter().enumerate() {
        let members: Vec<Candidate> = candidates
            .iter()
            .zip(&assignment)
            .filter(|(_, &a)| a == gi)
            .map(|(c, _)| *c)
            .collect();
        if let Some(group) = classify_group(point, &members)? {
            groups.push(group);
        }
    }
    Ok(groups)
}

fn push_unique(list: &mut Vec<VertexId>, v: VertexId) {
    if !list.contains(&v) {
        list.push(v);
    }
}

fn classify_group(point: DVec3, members: &[Candidate]) -> Result<Option<EventGroup>> {
    let Some(distance) = members.iter().map(|c| c.distance).reduce(f64::min) else {
        return Ok(None);
    };

    let mut events: Vec<Event> = Vec::new();
    for c in members {
        let e = c.into_event(point);
        if !events.iter().any(|x| *x == e) {
            events.push(e);
        }
    }

    let mut arrivals: Vec<VertexId> = Vec::new();
    let mut splits: Vec<(VertexId, EdgeRef)> = Vec::new();
    for e in &events {
        match e {
            Event::Intersection { trigger, neighbour, .. } => {
                push_unique(&mut arrivals, *trigger);
                push_unique(&mut arrivals, *neighbour);
            }
            Event::Split { trigger, edge, .. } => {
                if !splits.contains(&(*trigger, *edge)) {
                    splits.push((*trigger, *edge));
                }
            }
            _ => {}
        }
    }

    let split_triggers: HashSet<VertexId> = splits.iter().map(|(t, _)| *t).collect();
    if split_triggers.len() >= 2 {
        let mut triggers: Vec<VertexId> = Vec::with_capacity(split_triggers.len());
        for (t, _) in &splits {
            push_unique(&mut triggers, *t);
        }
        for t in &triggers {
            push_unique(&mut arrivals, *t);
        }
        let edges = splits.iter().map(|(_, e)| *e).collect();
        tracing::trace!(?point, ?triggers, "splits merged into vertex event");
        let vertex = Event::Vertex { distance, point, triggers, edges };
        return Ok(Some(EventGroup {
            kind: EventKind::Vertex,
            point,
            distance,
            arrivals,
            splits: Vec::new(),
            events: vec![vertex],
        }));
    }

    // A split landing on an edge whose endpoint also arrives here is really a
    // collapse at that endpoint.
    let mut kept = Vec::with_capacity(splits.len());
    for (t, e) in splits {
        if arrivals.contains(&e.start) || arrivals.contains(&e.end) {
            push_unique(&mut arrivals, t);
        } else {
            kept.push((t, e));
        }
    }
    let splits = kept;

    if splits.len() >= 2 {
        return Err(SkeletonError::DegenerateTopology { vertex: splits[0].0, point });
    }

    let kind = if splits.is_empty() {
        EventKind::Intersection
    } else {
        EventKind::Split
    };
    events.retain(|e| match e {
        Event::Split { trigger, edge, .. } => splits.contains(&(*trigger, *edge)),
        _ => true,
    });
    Ok(Some(EventGroup { kind, point, distance, arrivals, splits, events }))
}
