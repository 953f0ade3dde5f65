//! Geographic primitives used by area bridging.
//!
//! Distances are great-circle (haversine, mean Earth radius) in kilometres.
//! The convex hull treats (latitude, longitude) as planar coordinates; it is
//! only used to shrink the candidate set for inter-area distance searches,
//! so the planar approximation is acceptable.

use crate::inventory::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Indices of the points on the convex hull of `points`.
///
/// Degenerate inputs (fewer than 3 distinct points, or all points
/// collinear) return every index: the caller then simply searches the full
/// point set instead of a reduced one.
pub fn convex_hull_indices(points: &[GeoPoint]) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        let (a, b) = (&points[i], &points[j]);
        (a.latitude, a.longitude)
            .partial_cmp(&(b.latitude, b.longitude))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.dedup_by(|&mut i, &mut j| points[i] == points[j]);
    if order.len() < 3 {
        return (0..n).collect();
    }

    let cross = |o: usize, a: usize, b: usize| -> f64 {
        let (po, pa, pb) = (&points[o], &points[a], &points[b]);
        (pa.latitude - po.latitude) * (pb.longitude - po.longitude)
            - (pa.longitude - po.longitude) * (pb.latitude - po.latitude)
    };

    // Andrew's monotone chain, lower then upper hull.
    let mut hull: Vec<usize> = Vec::with_capacity(order.len() + 1);
    for &idx in &order {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], idx) <= 0.0 {
            hull.pop();
        }
        hull.push(idx);
    }
    let lower_len = hull.len() + 1;
    for &idx in order.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], idx) <= 0.0
        {
            hull.pop();
        }
        hull.push(idx);
    }
    hull.pop();

    if hull.len() < 3 {
        // Collinear input: no reduction possible.
        return (0..n).collect();
    }
    hull
}
