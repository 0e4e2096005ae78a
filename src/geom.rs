// Copyright 2025 Lars Brubaker
// License: MIT
//
// Pure geometric functions on glam vectors: rays, planes and the handful of
// predicates the skeleton needs. Nothing here holds state; the build direction
// is always passed in by the caller.

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::tolerance::{self, EPSILON, ON_LOCUS, PLANE_DETERMINANT};

/// A half-line starting at `origin`. `direction` is kept unit length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    /// Returns `None` for a zero-length direction.
    pub fn new(origin: DVec3, direction: DVec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Ray { origin, direction })
    }

    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

/// Plane through `point` with unit `normal`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: DVec3,
    pub normal: DVec3,
}

impl Plane {
    /// Returns `None` for a zero-length normal.
    pub fn new(point: DVec3, normal: DVec3) -> Option<Self> {
        let normal = normal.try_normalize()?;
        Some(Plane { point, normal })
    }

    /// Constant term `d` of `normal . x = d`.
    #[inline]
    pub fn offset(&self) -> f64 {
        self.normal.dot(self.point)
    }

    #[inline]
    pub fn signed_distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p - self.point)
    }

    pub fn project(&self, p: DVec3) -> DVec3 {
        p - self.normal * self.signed_distance(p)
    }

    /// The parallel plane shifted by `distance` along `direction`.
    pub fn translated(&self, direction: DVec3, distance: f64) -> Plane {
        Plane {
            point: self.point + direction * distance,
            normal: self.normal,
        }
    }
}

/// Point where `ray` crosses `plane`, accepting only forward hits.
pub fn ray_plane_intersection(ray: &Ray, plane: &Plane) -> Option<DVec3> {
    let denom = plane.normal.dot(ray.direction);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = (plane.offset() - plane.normal.dot(ray.origin)) / denom;
    if t < -ON_LOCUS {
        return None;
    }
    Some(ray.at(t.max(0.0)))
}

/// Common point of three planes, or `None` when two of them are (nearly) parallel.
pub fn three_plane_intersection(a: &Plane, b: &Plane, c: &Plane) -> Option<DVec3> {
    let coeffs = DMat3::from_cols(a.normal, b.normal, c.normal).transpose();
    let det = coeffs.determinant();
    if det.abs() < PLANE_DETERMINANT {
        return None;
    }
    let p = coeffs.inverse() * DVec3::new(a.offset(), b.offset(), c.offset());
    p.is_finite().then_some(p)
}

/// Direction of the line shared by two planes, or `None` if they are parallel.
pub fn plane_intersection_direction(a: &Plane, b: &Plane) -> Option<DVec3> {
    let dir = a.normal.cross(b.normal);
    if dir.length_squared() < EPSILON * EPSILON {
        return None;
    }
    Some(dir.normalize())
}

pub fn point_on_plane(p: DVec3, plane: &Plane, tolerance: f64) -> bool {
    plane.signed_distance(p).abs() <= tolerance
}

/// True if `p` lies on the ray (not behind its origin) within `tolerance`.
pub fn point_on_ray(p: DVec3, ray: &Ray, tolerance: f64) -> bool {
    let rel = p - ray.origin;
    let t = rel.dot(ray.direction);
    if t < -tolerance {
        return false;
    }
    (rel - ray.direction * t).length() <= tolerance
}

/// Unsigned angle between two vectors in radians.
pub fn angle_between(a: DVec3, b: DVec3) -> f64 {
    let denom = a.length() * b.length();
    if denom < EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

/// Rotate `v` about `axis` by `angle` radians (right-hand rule).
pub fn rotate_about_axis(v: DVec3, axis: DVec3, angle: f64) -> DVec3 {
    match axis.try_normalize() {
        Some(axis) => DQuat::from_axis_angle(axis, angle) * v,
        None => v,
    }
}

/// Signed distance of `p` from the line of `ray`, measured in the plane
/// orthogonal to `up`. Positive means left of the ray seen from above.
///
/// Rays running along `up` have no horizontal extent; they return 0.
pub fn side_of_ray(ray: &Ray, p: DVec3, up: DVec3) -> f64 {
    let flat = ray.direction - up * ray.direction.dot(up);
    let Some(flat) = flat.try_normalize() else {
        return 0.0;
    };
    flat.cross(p - ray.origin).dot(up)
}

/// True when `p` is on the same side of the ray's line as `reference`, seen
/// along `up`. A point within `tolerance` of the line counts as same side.
pub fn same_side_of_ray(ray: &Ray, p: DVec3, reference: DVec3, up: DVec3, tolerance: f64) -> bool {
    let sp = side_of_ray(ray, p, up);
    if sp.abs() <= tolerance {
        return true;
    }
    let sr = side_of_ray(ray, reference, up);
    sp.signum() == sr.signum()
}

/// A corner walked `incoming` then `outgoing` is reflex (interior angle above
/// 180°) when it turns clockwise about `up`. Assumes counter-clockwise winding.
pub fn is_reflex(incoming: DVec3, outgoing: DVec3, up: DVec3) -> bool {
    incoming.cross(outgoing).dot(up) < -EPSILON
}

/// Newell normal of a closed loop, scaled by twice its area.
pub fn newell_normal(points: &[DVec3]) -> DVec3 {
    let mut n = DVec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

pub fn round_point(p: DVec3) -> DVec3 {
    DVec3::new(
        tolerance::round_scalar(p.x),
        tolerance::round_scalar(p.y),
        tolerance::round_scalar(p.z),
    )
}

/// Distance from `p` to the segment `a`..`b`.
pub fn distance_to_segment(p: DVec3, a: DVec3, b: DVec3) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 < EPSILON * EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: DVec3 = DVec3::Z;

    #[test]
    fn ray_hits_plane_in_front() {
        let ray = Ray::new(DVec3::ZERO, DVec3::new(1.0, 0.0, 1.0)).unwrap();
        let plane = Plane::new(DVec3::new(0.0, 0.0, 2.0), UP).unwrap();
        let hit = ray_plane_intersection(&ray, &plane).unwrap();
        assert!(hit.distance(DVec3::new(2.0, 0.0, 2.0)) < 1e-12);
    }

    #[test]
    fn ray_misses_plane_behind() {
        let ray = Ray::new(DVec3::ZERO, UP).unwrap();
        let plane = Plane::new(DVec3::new(0.0, 0.0, -1.0), UP).unwrap();
        assert!(ray_plane_intersection(&ray, &plane).is_none());
    }

    #[test]
    fn three_axis_planes_meet_at_corner() {
        let a = Plane::new(DVec3::new(1.0, 0.0, 0.0), DVec3::X).unwrap();
        let b = Plane::new(DVec3::new(0.0, 2.0, 0.0), DVec3::Y).unwrap();
        let c = Plane::new(DVec3::new(0.0, 0.0, 3.0), DVec3::Z).unwrap();
        let p = three_plane_intersection(&a, &b, &c).unwrap();
        assert!(p.distance(DVec3::new(1.0, 2.0, 3.0)) < 1e-12);
    }

    #[test]
    fn parallel_planes_have_no_common_point() {
        let a = Plane::new(DVec3::ZERO, DVec3::X).unwrap();
        let b = Plane::new(DVec3::X, DVec3::X).unwrap();
        let c = Plane::new(DVec3::ZERO, DVec3::Y).unwrap();
        assert!(three_plane_intersection(&a, &b, &c).is_none());
    }

    #[test]
    fn rotation_about_edge_tilts_toward_up() {
        // Inward normal of an edge running along +X is +Y; a positive turn
        // about +X lifts it toward +Z.
        let r = rotate_about_axis(DVec3::Y, DVec3::X, std::f64::consts::FRAC_PI_4);
        assert!((r.y - r.z).abs() < 1e-12);
        assert!(r.z > 0.0);
    }

    #[test]
    fn same_side_accepts_points_on_the_line() {
        let ray = Ray::new(DVec3::ZERO, DVec3::new(1.0, 0.0, 0.5)).unwrap();
        let reference = DVec3::new(0.0, 1.0, 0.0);
        assert!(same_side_of_ray(&ray, DVec3::new(5.0, 2.0, 9.0), reference, UP, ON_LOCUS));
        assert!(same_side_of_ray(&ray, DVec3::new(5.0, 0.0, 9.0), reference, UP, ON_LOCUS));
        assert!(!same_side_of_ray(&ray, DVec3::new(5.0, -2.0, 0.0), reference, UP, ON_LOCUS));
    }

    #[test]
    fn reflex_follows_turn_direction() {
        assert!(!is_reflex(DVec3::X, DVec3::Y, UP));
        assert!(is_reflex(DVec3::X, -DVec3::Y, UP));
        assert!(!is_reflex(DVec3::X, DVec3::X, UP));
    }

    #[test]
    fn point_on_ray_rejects_points_behind_origin() {
        let ray = Ray::new(DVec3::ZERO, DVec3::X).unwrap();
        assert!(point_on_ray(DVec3::new(3.0, 0.0, 0.0), &ray, ON_LOCUS));
        assert!(!point_on_ray(DVec3::new(-3.0, 0.0, 0.0), &ray, ON_LOCUS));
        assert!(!point_on_ray(DVec3::new(3.0, 0.1, 0.0), &ray, ON_LOCUS));
    }

    #[test]
    fn newell_normal_of_unit_square() {
        let sq = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        let n = newell_normal(&sq);
        assert!((n - DVec3::new(0.0, 0.0, 2.0)).length() < 1e-12);
    }

    #[test]
    fn angle_between_orthogonal_vectors() {
        let a = angle_between(DVec3::X, DVec3::Y);
        assert!((a - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
