//! Station connectivity within one frequency band.
//!
//! Two stations are connected when some event observed both of them with a
//! valid amplification value; areas are the connected components of that
//! co-occurrence graph. Components are computed with a disjoint-set union
//! over the per-event station sets.

use crate::types::{valid, ResultSet};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

/// Disjoint-set union with path compression and union by size.
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

/// Merge overlapping sets until all remaining sets are pairwise disjoint.
///
/// Output order is deterministic: sets are sorted by their smallest element.
pub fn merge_sets(sets: Vec<BTreeSet<String>>) -> Vec<BTreeSet<String>> {
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    let mut names: Vec<&str> = Vec::new();
    for set in &sets {
        for name in set {
            index.entry(name.as_str()).or_insert_with(|| {
                names.push(name.as_str());
                names.len() - 1
            });
        }
    }

    let mut dsu = DisjointSet::new(names.len());
    for set in &sets {
        let mut iter = set.iter();
        if let Some(first) = iter.next() {
            let fi = index[first.as_str()];
            for other in iter {
                dsu.union(fi, index[other.as_str()]);
            }
        }
    }

    let mut grouped: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        let root = dsu.find(i);
        grouped.entry(root).or_default().insert((*name).to_string());
    }

    let mut merged: Vec<BTreeSet<String>> = grouped.into_values().collect();
    merged.sort_by(|a, b| a.iter().next().cmp(&b.iter().next()));
    merged
}

/// Partition the stations observed at `band` into connected areas.
///
/// Returns a map from a representative station (the lexicographically
/// smallest member) to the full station set of its area. A station with no
/// valid co-occurrence forms a singleton area.
pub fn find_unconnected_areas(
    results: &ResultSet,
    band: usize,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut per_event: Vec<BTreeSet<String>> = Vec::new();
    for record in results.events.values() {
        let stations: BTreeSet<String> = record
            .site_amplification
            .iter()
            .filter(|(_, amps)| valid(amps.get(band).copied().flatten()).is_some())
            .map(|(sta, _)| sta.clone())
            .collect();
        if !stations.is_empty() {
            per_event.push(stations);
        }
    }

    let merged = merge_sets(per_event);
    let areas: BTreeMap<String, BTreeSet<String>> = merged
        .into_iter()
        .filter_map(|set| set.iter().next().cloned().map(|name| (name, set)))
        .collect();

    info!("found {} unconnected areas", areas.len());
    for (name, stations) in &areas {
        debug!("area \"{}\" with {} stations", name, stations.len());
    }
    areas
}
