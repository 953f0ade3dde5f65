//! Heuristic merging of geographically close but unconnected areas.
//!
//! Two disconnected areas can still describe the same region when their
//! closest stations sit a few kilometres apart. The bridger reduces each
//! area to its convex-hull stations, computes minimum great-circle
//! distances between hull-vertex pairs, and greedily merges the globally
//! nearest area pair until the remaining distances exceed the configured
//! maximum. Each merge records the closest station pair; the system builder
//! later treats such a pair as the same station across the former areas.
//!
//! The greedy nearest-pair strategy is approximate and occasionally merges
//! areas through an unfortunate station pair. It is kept as-is.

use crate::diagnostics::BridgeDiagnostics;
use crate::error::{AlignError, AlignResult};
use crate::geo::{convex_hull_indices, haversine_km};
use crate::inventory::{CoordinateIndex, GeoPoint};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Symmetric station -> station map of bridged pairs.
pub type BridgeMap = BTreeMap<String, String>;

/// Result of a bridging pass over the area mapping of one frequency band.
pub struct BridgeOutcome {
    /// Merged area mapping; representative names survive from the absorbing
    /// side of each merge.
    pub areas: BTreeMap<String, BTreeSet<String>>,
    /// Bridged station pairs, recorded in both directions.
    pub near_stations: BridgeMap,
    /// One entry per performed merge, for diagnostics.
    pub links: Vec<BridgeDiagnostics>,
}

type AreaPair = (String, String);

fn ordered_pair(a: &str, b: &str) -> AreaPair {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn station_points(
    stations: &BTreeSet<String>,
    coords: &CoordinateIndex,
) -> AlignResult<Vec<(String, GeoPoint)>> {
    stations
        .iter()
        .map(|sta| {
            coords
                .get(sta)
                .map(|p| (sta.clone(), p))
                .ok_or_else(|| AlignError::UnknownStation(sta.clone()))
        })
        .collect()
}

/// Reduce an area to the stations on the convex hull of its coordinates.
/// Degenerate areas (fewer than 3 distinct points) keep all stations.
fn hull_stations(
    stations: &BTreeSet<String>,
    coords: &CoordinateIndex,
) -> AlignResult<BTreeSet<String>> {
    let named = station_points(stations, coords)?;
    let points: Vec<GeoPoint> = named.iter().map(|(_, p)| *p).collect();
    Ok(convex_hull_indices(&points)
        .into_iter()
        .map(|i| named[i].0.clone())
        .collect())
}

/// Minimum great-circle distance between two station sets, with the station
/// pair achieving it.
fn min_pair_distance(
    a: &BTreeSet<String>,
    b: &BTreeSet<String>,
    coords: &CoordinateIndex,
) -> AlignResult<(f64, (String, String))> {
    let mut best: Option<(f64, (String, String))> = None;
    for sta1 in a {
        let p1 = coords
            .get(sta1)
            .ok_or_else(|| AlignError::UnknownStation(sta1.clone()))?;
        for sta2 in b {
            let p2 = coords
                .get(sta2)
                .ok_or_else(|| AlignError::UnknownStation(sta2.clone()))?;
            let dist = haversine_km(p1, p2);
            if best.as_ref().map_or(true, |(d, _)| dist < *d) {
                best = Some((dist, (sta1.clone(), sta2.clone())));
            }
        }
    }
    // Areas are non-empty by construction.
    Ok(best.expect("empty area in distance computation"))
}

/// Greedily merge areas whose minimum inter-station distance is at most
/// `max_distance_km`.
pub fn join_unconnected_areas(
    areas: BTreeMap<String, BTreeSet<String>>,
    max_distance_km: f64,
    coords: &CoordinateIndex,
) -> AlignResult<BridgeOutcome> {
    let mut areas = areas;
    let mut hulls: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, stations) in &areas {
        hulls.insert(name.clone(), hull_stations(stations, coords)?);
    }

    let names: Vec<String> = areas.keys().cloned().collect();
    let mut distance: BTreeMap<AreaPair, (f64, (String, String))> = BTreeMap::new();
    for (i, a1) in names.iter().enumerate() {
        for a2 in names.iter().skip(i + 1) {
            let pair = ordered_pair(a1, a2);
            distance.insert(pair, min_pair_distance(&hulls[a1], &hulls[a2], coords)?);
        }
    }

    let mut near_stations: BridgeMap = BTreeMap::new();
    let mut links: Vec<BridgeDiagnostics> = Vec::new();
    while !distance.is_empty() {
        let nearest_pair = distance
            .iter()
            .min_by(|(ka, (da, _)), (kb, (db, _))| {
                da.partial_cmp(db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(k, _)| k.clone())
            .expect("non-empty distance table");
        let (dist, (s1, s2)) = distance.remove(&nearest_pair).expect("pair just found");
        if dist > max_distance_km {
            break;
        }
        let (a1, a2) = nearest_pair;
        debug!("connect areas {} and {} with distance {:.1}km", a1, a2, dist);
        near_stations.insert(s1.clone(), s2.clone());
        near_stations.insert(s2.clone(), s1.clone());
        links.push(BridgeDiagnostics {
            area_a: a1.clone(),
            area_b: a2.clone(),
            station_a: s1,
            station_b: s2,
            distance_km: dist,
        });

        let absorbed = areas.remove(&a2).expect("area present in mapping");
        areas.get_mut(&a1).expect("area present in mapping").extend(absorbed);
        let absorbed_hull = hulls.remove(&a2).expect("hull present in mapping");
        hulls.get_mut(&a1).expect("hull present in mapping").extend(absorbed_hull);

        // Contract the distance table: entries involving the absorbed area
        // fold into the surviving one, keeping the smaller distance.
        let others: Vec<String> = areas.keys().filter(|n| **n != a1).cloned().collect();
        for a3 in others {
            let pair1 = ordered_pair(&a1, &a3);
            let pair2 = ordered_pair(&a2, &a3);
            if let Some(entry2) = distance.remove(&pair2) {
                match distance.get(&pair1) {
                    Some((d1, _)) if entry2.0 >= *d1 => {}
                    _ => {
                        distance.insert(pair1, entry2);
                    }
                }
            }
        }
    }

    Ok(BridgeOutcome {
        areas,
        near_stations,
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, f64, f64)]) -> CoordinateIndex {
        CoordinateIndex::from_coords(entries.iter().map(|(name, lat, lon)| {
            (
                name.to_string(),
                GeoPoint {
                    latitude: *lat,
                    longitude: *lon,
                },
            )
        }))
    }

    fn area(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn two_area_setup() -> (BTreeMap<String, BTreeSet<String>>, CoordinateIndex) {
        // Western cluster around (50, 10), eastern cluster around (50, 11).
        // Closest pair is N.B <-> N.C, roughly 36 km apart.
        let coords = index(&[
            ("N.A", 50.0, 9.8),
            ("N.B", 50.0, 10.0),
            ("N.C", 50.0, 10.5),
            ("N.D", 50.0, 11.0),
        ]);
        let mut areas = BTreeMap::new();
        areas.insert("N.A".to_string(), area(&["N.A", "N.B"]));
        areas.insert("N.C".to_string(), area(&["N.C", "N.D"]));
        (areas, coords)
    }

    #[test]
    fn areas_beyond_max_distance_stay_separate() {
        let (areas, coords) = two_area_setup();
        let outcome = join_unconnected_areas(areas, 30.0, &coords).unwrap();
        assert_eq!(outcome.areas.len(), 2);
        assert!(outcome.near_stations.is_empty());
        assert!(outcome.links.is_empty());
    }

    #[test]
    fn areas_within_max_distance_merge_via_closest_pair() {
        let (areas, coords) = two_area_setup();
        let outcome = join_unconnected_areas(areas, 50.0, &coords).unwrap();
        assert_eq!(outcome.areas.len(), 1);
        let merged = &outcome.areas["N.A"];
        assert_eq!(merged, &area(&["N.A", "N.B", "N.C", "N.D"]));
        assert_eq!(outcome.near_stations["N.B"], "N.C");
        assert_eq!(outcome.near_stations["N.C"], "N.B");
        let link = &outcome.links[0];
        assert!((link.distance_km - 35.7).abs() < 1.0, "d={}", link.distance_km);
    }

    #[test]
    fn chain_of_areas_merges_transitively() {
        let coords = index(&[
            ("N.A", 50.0, 10.0),
            ("N.B", 50.0, 10.3),
            ("N.C", 50.0, 10.6),
        ]);
        let mut areas = BTreeMap::new();
        areas.insert("N.A".to_string(), area(&["N.A"]));
        areas.insert("N.B".to_string(), area(&["N.B"]));
        areas.insert("N.C".to_string(), area(&["N.C"]));
        // Each neighbour is ~21 km apart, ends are ~43 km apart.
        let outcome = join_unconnected_areas(areas, 25.0, &coords).unwrap();
        assert_eq!(outcome.areas.len(), 1);
        assert_eq!(outcome.links.len(), 2);
    }

    #[test]
    fn missing_coordinates_surface_as_error() {
        let coords = index(&[("N.A", 50.0, 10.0)]);
        let mut areas = BTreeMap::new();
        areas.insert("N.A".to_string(), area(&["N.A"]));
        areas.insert("N.B".to_string(), area(&["N.B"]));
        assert!(matches!(
            join_unconnected_areas(areas, 10.0, &coords),
            Err(AlignError::UnknownStation(_))
        ));
    }
}
