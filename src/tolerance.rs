// Copyright 2025 Lars Brubaker
// License: MIT
//
// Every floating-point comparison the skeleton makes goes through one of the
// constants below. Distances are in footprint units.

use glam::DVec3;

/// Lengths, determinants and dot products below this are treated as zero.
pub const EPSILON: f64 = 1e-9;

/// Determinant threshold for the 3-plane solve; below it the planes are
/// considered parallel.
pub const PLANE_DETERMINANT: f64 = 1e-7;

/// A point this close to a ray or plane lies on it.
pub const ON_LOCUS: f64 = 1e-6;

/// Events whose distances differ from the minimum by less than this happen "now".
pub const EVENT_BAND: f64 = 1e-5;

/// Intersection points closer than this are coalesced into one averaged point.
pub const MERGE_RADIUS: f64 = 1e-4;

/// A vertex closer than this to the line through its neighbours is colinear.
pub const COLINEAR: f64 = 1e-6;

/// Footprint points further than this from the footprint plane are rejected.
pub const PLANARITY: f64 = 1e-5;

/// Decimal digits kept by [`round_scalar`].
pub const ROUND_DIGITS: i32 = 9;

#[inline]
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Round to [`ROUND_DIGITS`] decimals. Negative zero comes back as zero.
pub fn round_scalar(value: f64) -> f64 {
    let scale = 10f64.powi(ROUND_DIGITS);
    let r = (value * scale).round() / scale;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Cluster points lying within `radius` of each other and replace every
/// cluster with its average.
///
/// Returns the merged points and, for each input point, the index of the
/// merged point it was assigned to. Clustering is repeated until no two merged
/// points are within `radius`, so feeding the output back in returns it
/// unchanged.
pub fn merge_points(points: &[DVec3], radius: f64) -> (Vec<DVec3>, Vec<usize>) {
    let mut assignment: Vec<usize> = (0..points.len()).collect();
    let mut centers: Vec<DVec3> = points.to_vec();

    loop {
        let mut cluster_of: Vec<usize> = Vec::with_capacity(centers.len());
        let mut sums: Vec<(DVec3, f64)> = Vec::new();
        let mut reps: Vec<DVec3> = Vec::new();

        for (i, c) in centers.iter().enumerate() {
            let weight = assignment.iter().filter(|&&a| a == i).count().max(1) as f64;
            match reps.iter().position(|r| r.distance(*c) <= radius) {
                Some(k) => {
                    sums[k].0 += *c * weight;
                    sums[k].1 += weight;
                    cluster_of.push(k);
                }
                None => {
                    reps.push(*c);
                    sums.push((*c * weight, weight));
                    cluster_of.push(reps.len() - 1);
                }
            }
        }

        if reps.len() == centers.len() {
            break;
        }
        for a in assignment.iter_mut() {
            *a = cluster_of[*a];
        }
        centers = sums.iter().map(|(sum, w)| *sum / *w).collect();
    }

    (centers, assignment)
}
