// Copyright 2025 Lars Brubaker
// Shared test utilities for roof-skeleton tests.

#![allow(dead_code)]

use glam::DVec3;
use roof_skeleton::{EdgeWeight, Footprint, RoofSkeleton, Skeleton, SkeletonConfig};

pub const UP: DVec3 = DVec3::Z;

/// 45 degrees.
pub const FORTY_FIVE: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Lift `(x, y)` pairs onto the z = 0 plane.
pub fn pts(xy: &[(f64, f64)]) -> Vec<DVec3> {
    xy.iter().map(|&(x, y)| DVec3::new(x, y, 0.0)).collect()
}

pub fn square(side: f64) -> Vec<DVec3> {
    pts(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)])
}

pub fn rectangle(w: f64, h: f64) -> Vec<DVec3> {
    pts(&[(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)])
}

pub fn right_triangle() -> Vec<DVec3> {
    pts(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)])
}

/// Six corners, one reflex notch at (3, 1) pointing at the bottom edge.
pub fn notched_hexagon() -> Vec<DVec3> {
    pts(&[(0.0, 0.0), (6.0, 0.0), (6.0, 3.0), (4.0, 3.0), (3.0, 1.0), (0.0, 3.0)])
}

/// Rectangle pinched by two opposite V notches whose reflex tips meet at
/// (2, 2) at the same time.
pub fn pinched_rectangle() -> Vec<DVec3> {
    pts(&[
        (-2.0, 0.0),
        (1.0, 0.0),
        (2.0, 1.0),
        (3.0, 0.0),
        (6.0, 0.0),
        (6.0, 4.0),
        (3.0, 4.0),
        (2.0, 3.0),
        (1.0, 4.0),
        (-2.0, 4.0),
    ])
}

/// L with a 1-wide horizontal arm and a 2-wide vertical arm.
pub fn l_shape() -> Vec<DVec3> {
    pts(&[(0.0, 0.0), (5.0, 0.0), (5.0, 1.0), (2.0, 1.0), (2.0, 4.0), (0.0, 4.0)])
}

/// L with equal 2-wide arms: the reflex corner reaches the outer corner's
/// diagonal exactly when it touches both outer edges.
pub fn even_l_shape() -> Vec<DVec3> {
    pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 2.0), (2.0, 2.0), (2.0, 4.0), (0.0, 4.0)])
}

pub fn uniform(points: Vec<DVec3>, weight: f64) -> Footprint {
    Footprint::uniform(points, weight, UP).expect("valid footprint")
}

pub fn weighted(points: Vec<DVec3>, weights: Vec<EdgeWeight>) -> Footprint {
    Footprint::new(points, weights, UP).expect("valid footprint")
}

pub fn build(footprint: &Footprint) -> RoofSkeleton {
    Skeleton::default().build(footprint).expect("skeleton builds")
}

pub fn build_with(footprint: &Footprint, config: SkeletonConfig) -> RoofSkeleton {
    Skeleton::new(config)
        .expect("valid config")
        .build(footprint)
        .expect("skeleton builds")
}

/// Every face point lies on its face plane.
pub fn assert_faces_planar(roof: &RoofSkeleton, tolerance: f64) {
    for face in roof.faces() {
        let dev = face.plane_deviation();
        assert!(
            dev <= tolerance,
            "face of edge {} ({:?}) is {dev} off its plane: {:?}",
            face.edge,
            face.phase,
            face.points
        );
    }
}

/// `v.next.prev == v` and `v.prev.next == v` for every active vertex.
pub fn assert_links_bidirectional(roof: &RoofSkeleton) {
    let arena = roof.vertices();
    for v in arena.iter().filter(|v| v.active) {
        let next = v.next().expect("active vertex has a next");
        let prev = v.prev().expect("active vertex has a prev");
        assert_eq!(arena[next].prev(), Some(v.id), "broken back link at {}", v.id);
        assert_eq!(arena[prev].next(), Some(v.id), "broken forward link at {}", v.id);
    }
}

/// Every vertex height is non-negative and no higher than the apex.
pub fn assert_heights_sane(roof: &RoofSkeleton) {
    let apex = roof.apex_height();
    for v in roof.vertices().iter() {
        let h = roof.height_of(v.position);
        assert!(h >= -1e-9 && h <= apex + 1e-9, "vertex {} at height {h}", v.id);
    }
}

/// Sum of the face areas projected onto the footprint plane.
pub fn projected_area(roof: &RoofSkeleton) -> f64 {
    roof.faces()
        .iter()
        .map(|f| {
            let flat: Vec<DVec3> = f.points.iter().map(|p| DVec3::new(p.x, p.y, 0.0)).collect();
            roof_skeleton::geom::newell_normal(&flat).z.abs() * 0.5
        })
        .sum()
}

pub fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}
