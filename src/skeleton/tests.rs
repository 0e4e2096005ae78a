// Copyright 2025 Lars Brubaker
// Unit tests for the skeleton driver internals.

use super::*;
use crate::event::EventKind;
use crate::vertex::{NEXT, PREV};

fn flat(xy: &[(f64, f64)]) -> Vec<DVec3> {
    xy.iter().map(|&(x, y)| DVec3::new(x, y, 0.0)).collect()
}

fn footprint(xy: &[(f64, f64)]) -> Footprint {
    Footprint::uniform(flat(xy), std::f64::consts::FRAC_1_SQRT_2, DVec3::Z).unwrap()
}

fn unit_square() -> Footprint {
    footprint(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])
}

fn hexagon() -> Footprint {
    footprint(&[(0.0, 0.0), (6.0, 0.0), (6.0, 3.0), (4.0, 3.0), (3.0, 1.0), (0.0, 3.0)])
}

fn pentagon() -> Footprint {
    footprint(&[(0.0, 0.0), (2.0, 0.0), (3.0, 1.5), (1.0, 3.0), (-1.0, 1.5)])
}

fn seeded<'a>(config: &'a SkeletonConfig, fp: &'a Footprint) -> SkeletonBuilder<'a> {
    let mut b = SkeletonBuilder::new(config, fp);
    b.seed().unwrap();
    b
}

fn first_task(b: &SkeletonBuilder) -> Task {
    *b.work.front().unwrap()
}

#[test]
fn seed_allocates_footprint_loop() {
    let config = SkeletonConfig::default();
    let fp = unit_square();
    let mut b = SkeletonBuilder::new(&config, &fp);
    b.seed().unwrap();

    assert_eq!(b.arena.len(), 4);
    assert_eq!(b.footprint, (0..4).map(VertexId).collect::<Vec<_>>());
    assert_eq!(b.caps.len(), 4);
    assert!(b.caps.iter().all(|c| c.kind == CapKind::Footprint));
    assert!(b.ledger.iter().all(|l| l.len() == 2 && !l.degenerated()));
    for (i, &v) in b.footprint.iter().enumerate() {
        assert_eq!(b.arena[v].edge_out, i);
        assert_eq!(b.arena[v].edge_in, (i + 3) % 4);
        assert_eq!(b.arena[v].next(), Some(b.footprint[(i + 1) % 4]));
    }
    assert_eq!(b.work.len(), 1);
    assert_eq!(first_task(&b).depth, 0);
}

#[test]
fn clockwise_outline_is_reversed() {
    let config = SkeletonConfig::default();
    let fp = footprint(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
    assert!(fp.is_clockwise());
    let b = SkeletonBuilder::new(&config, &fp);

    assert_eq!(b.points[0], DVec3::new(1.0, 0.0, 0.0));
    assert_eq!(b.edge_map, vec![2, 1, 0, 3]);
    // Working edge 0 runs (1,0) -> (1,1), the reverse of caller edge 2.
    let caller = fp.points();
    assert_eq!(b.points[0], caller[3]);
    assert_eq!(b.points[1], caller[2]);
}

#[test]
fn footprint_scale_grows_about_centroid() {
    let config = SkeletonConfig {
        footprint_scale: 2.0,
        ..SkeletonConfig::default()
    };
    let fp = unit_square();
    let b = SkeletonBuilder::new(&config, &fp);
    assert!((b.points[0] - DVec3::new(-0.5, -0.5, 0.0)).length() < 1e-12);
    assert!((b.points[2] - DVec3::new(1.5, 1.5, 0.0)).length() < 1e-12);
}

#[test]
fn square_corners_rise_along_diagonals() {
    let config = SkeletonConfig::default();
    let fp = unit_square();
    let mut b = SkeletonBuilder::new(&config, &fp);
    b.seed().unwrap();
    let polygon = Polygon::from_links(&b.arena, b.footprint[0], b.up).unwrap();
    let edges = b.finalize(&polygon, SlopePhase::Lower).unwrap();

    assert_eq!(edges.len(), 4);
    let expected = DVec3::new(1.0, 1.0, 1.0).normalize();
    let ray = b.arena[VertexId(0)].rotated_bisector.unwrap();
    assert!((ray.direction - expected).length() < 1e-9, "{:?}", ray.direction);
    assert!(b.arena.iter().all(|v| !v.reflex));
}

#[test]
fn notch_is_the_only_reflex_corner() {
    let config = SkeletonConfig::default();
    let fp = hexagon();
    let mut b = SkeletonBuilder::new(&config, &fp);
    b.seed().unwrap();
    let polygon = Polygon::from_links(&b.arena, b.footprint[0], b.up).unwrap();
    let edges = b.finalize(&polygon, SlopePhase::Lower).unwrap();

    let reflex: Vec<VertexId> = b.arena.iter().filter(|v| v.reflex).map(|v| v.id).collect();
    assert_eq!(reflex, vec![VertexId(4)]);

    let candidates = b.candidates(&polygon, &edges);
    let split = candidates
        .iter()
        .find(|c| c.trigger == VertexId(4) && c.edge.source == 0)
        .expect("notch reaches the bottom edge");
    assert!(split.partner.is_none());
    assert!((split.distance - 0.406437).abs() < 1e-5, "{}", split.distance);

    let nearest = event::select_nearest(candidates);
    assert!(nearest.iter().all(|c| c.trigger == VertexId(4)));
}

#[test]
fn square_collapses_in_one_step() {
    let config = SkeletonConfig::default();
    let fp = unit_square();
    let mut b = SkeletonBuilder::new(&config, &fp);
    b.seed().unwrap();
    let task = b.work.pop_front().unwrap();
    b.run_task(task).unwrap();

    assert!(b.work.is_empty());
    assert_eq!(b.iterations.len(), 1);
    let record = &b.iterations[0];
    assert_eq!(record.polygons, 0);
    assert_eq!(record.events.len(), 1);
    assert_eq!(record.events[0].kind, EventKind::Intersection);
    assert!((record.distance - 0.5).abs() < 1e-9);

    let apex = b.arena[VertexId(0)].child.unwrap();
    for &v in &b.footprint {
        assert!(b.arena[v].processed);
        assert_eq!(b.arena[v].child, Some(apex));
    }
    assert!((b.arena.position(apex) - DVec3::new(0.5, 0.5, 0.5)).length() < 1e-9);
    assert!(!b.arena[apex].active);
}

#[test]
fn depth_limit_caps_the_loop() {
    let config = SkeletonConfig {
        max_iteration_depth: 1,
        ..SkeletonConfig::default()
    };
    let fp = unit_square();
    let mut b = SkeletonBuilder::new(&config, &fp);
    b.seed().unwrap();
    b.run_task(Task {
        start: b.footprint[0],
        depth: 1,
        phase: SlopePhase::Lower,
    })
    .unwrap();

    assert!(b.iterations.is_empty());
    assert_eq!(b.caps.iter().filter(|c| c.kind == CapKind::Final).count(), 4);
    assert!(b.arena.iter().all(|v| !v.active));
}

#[test]
fn colinear_child_is_removed_and_recorded() {
    let config = SkeletonConfig::default();
    let fp = footprint(&[(0.0, 0.0), (2.0, 0.0), (4.0, 0.0), (4.0, 2.0), (0.0, 2.0)]);
    let mut b = SkeletonBuilder::new(&config, &fp);
    b.seed().unwrap();
    let task = b.work.pop_front().unwrap();
    b.run_task(task).unwrap();

    // The middle corner's child lands on the ridge between the two collapses.
    let mid = b.arena[VertexId(1)].child.unwrap();
    assert!(!b.arena[mid].active);
    assert!((b.arena.position(mid) - DVec3::new(2.0, 1.0, 1.0)).length() < 1e-9);
    assert!(b.ledger[0].degenerated());
    assert!(b.ledger[1].degenerated());
    assert!(!b.ledger[2].degenerated());
    assert_eq!(b.caps.iter().filter(|c| c.kind == CapKind::Collapsed).count(), 4);
    assert!(b.work.is_empty());
}

#[test]
fn slope_change_lifts_the_whole_loop() {
    let config = SkeletonConfig::default().with_mansard(0.1, 0.4, 0.4);
    let fp = unit_square();
    let mut b = SkeletonBuilder::new(&config, &fp);
    b.seed().unwrap();
    let task = b.work.pop_front().unwrap();
    b.run_task(task).unwrap();

    assert!(b.slope_change_applied);
    assert_eq!(b.iterations[0].events[0].kind, EventKind::ChangeSlope);
    let next = first_task(&b);
    assert_eq!(next.phase, SlopePhase::Upper);
    assert_eq!(next.depth, 1);
    assert!((b.height_of(b.arena.position(next.start)) - 0.1).abs() < 1e-9);
    assert_eq!(
        b.caps.iter().filter(|c| c.kind == CapKind::Boundary).count(),
        8
    );
    // The upper loop never changes slope again.
    assert_eq!(b.slope_change_height(SlopePhase::Upper, 0.1), None);
}

#[test]
fn stale_back_link_is_repaired() {
    let config = SkeletonConfig::default();
    let fp = pentagon();
    let mut b = seeded(&config, &fp);
    let ids = b.footprint.clone();
    b.arena[ids[2]].neighbors[PREV] = Some(ids[4]);

    let survivors = b.validate(&ids).unwrap();
    assert_eq!(survivors, ids);
    assert_eq!(b.arena[ids[2]].prev(), Some(ids[1]));
    for &v in &ids {
        let n = b.arena[v].next().unwrap();
        assert_eq!(b.arena[n].prev(), Some(v));
    }
}

#[test]
fn stale_forward_link_is_repaired() {
    let config = SkeletonConfig::default();
    let fp = pentagon();
    let mut b = seeded(&config, &fp);
    let ids = b.footprint.clone();
    // The outside vertex is not revalidated, only its successor.
    b.arena[ids[0]].neighbors[NEXT] = Some(ids[3]);

    let survivors = b.validate(&ids[1..]).unwrap();
    assert_eq!(survivors.len(), 4);
    assert_eq!(b.arena[ids[0]].next(), Some(ids[1]));
    assert_eq!(b.arena[ids[1]].edge_in, b.arena[ids[0]].edge_out);
}

#[test]
fn contested_back_link_is_an_accuracy_error() {
    let config = SkeletonConfig::default();
    let fp = pentagon();
    let mut b = seeded(&config, &fp);
    let ids = b.footprint.clone();
    // Both ids[3] and ids[4] now claim ids[0] as their successor.
    b.arena[ids[3]].neighbors[NEXT] = Some(ids[0]);

    let err = b.validate(&ids).unwrap_err();
    assert!(matches!(err, SkeletonError::Accuracy(_)), "{err}");
    assert_eq!(b.arena[ids[0]].prev(), Some(ids[4]));
}
