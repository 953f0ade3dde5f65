//! Assembly of the per-band log-linear least-squares system.
//!
//! Unknowns are one log scale factor per event. Rows come in three kinds:
//! a pinning row forcing an event's factor to move a chosen station's
//! response onto the reference value, a pair row equating the response a
//! station implies in two different events, and (when no station is pinned)
//! a single normalization row fixing the weighted geometric mean of all
//! responses. The builder owns the row storage explicitly; rows are
//! accumulated densely or as coordinate triplets depending on the solver
//! that will consume them.

use crate::bridging::BridgeMap;
use crate::types::{valid, ResultSet};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Row-major dense storage or coordinate-format sparse storage.
pub enum SystemMatrix {
    Dense(Vec<f64>),
    Coo {
        values: Vec<f64>,
        row_indices: Vec<usize>,
        col_indices: Vec<usize>,
    },
}

/// An assembled least-squares system `A x = b` in log space.
pub struct LinearSystem {
    pub unknowns: usize,
    pub rows: usize,
    pub matrix: SystemMatrix,
    pub rhs: Vec<f64>,
}

impl LinearSystem {
    pub fn is_sparse(&self) -> bool {
        matches!(self.matrix, SystemMatrix::Coo { .. })
    }
}

/// Incremental row accumulator for [`LinearSystem`].
pub struct SystemBuilder {
    unknowns: usize,
    matrix: SystemMatrix,
    rhs: Vec<f64>,
    row_count: usize,
}

impl SystemBuilder {
    pub fn new(unknowns: usize, sparse: bool) -> Self {
        let matrix = if sparse {
            SystemMatrix::Coo {
                values: Vec::new(),
                row_indices: Vec::new(),
                col_indices: Vec::new(),
            }
        } else {
            SystemMatrix::Dense(Vec::new())
        };
        Self {
            unknowns,
            matrix,
            rhs: Vec::new(),
            row_count: 0,
        }
    }

    /// Append one row given its non-zero column weights.
    pub fn add_row<I>(&mut self, coldata: I, rhs: f64)
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        self.rhs.push(rhs);
        match &mut self.matrix {
            SystemMatrix::Dense(rows) => {
                let offset = rows.len();
                rows.resize(offset + self.unknowns, 0.0);
                for (col, value) in coldata {
                    rows[offset + col] = value;
                }
            }
            SystemMatrix::Coo {
                values,
                row_indices,
                col_indices,
            } => {
                for (col, value) in coldata {
                    values.push(value);
                    row_indices.push(self.row_count);
                    col_indices.push(col);
                }
            }
        }
        self.row_count += 1;
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn finish(self) -> LinearSystem {
        LinearSystem {
            unknowns: self.unknowns,
            rows: self.row_count,
            matrix: self.matrix,
            rhs: self.rhs,
        }
    }
}

/// Build the alignment system for one frequency band.
///
/// `area` is the station set selected for this band (largest connected
/// area, possibly bridged). `station_counts` holds, per station, the number
/// of events with a valid observation at this band; together with the
/// number of distinct observed stations it weights the normalization row so
/// every station contributes equally however often it was observed.
/// `bridges` makes a bridged station pair share connectivity state.
#[allow(clippy::too_many_arguments)]
pub fn build_band_system(
    results: &ResultSet,
    band: usize,
    area: &BTreeSet<String>,
    bridges: Option<&BridgeMap>,
    station_counts: &BTreeMap<String, usize>,
    pinned_station: Option<&str>,
    reference_value: f64,
    sparse: bool,
) -> LinearSystem {
    let ne = results.event_count();
    let num_stations = station_counts.len();
    let mut builder = SystemBuilder::new(ne, sparse);

    let mut norm_row: BTreeMap<usize, f64> = BTreeMap::new();
    let mut norm_rhs = 0.0f64;
    // Event index and observed response of the most recent sighting of each
    // station within the selected area.
    let mut last: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

    for (k, record) in results.events.values().enumerate() {
        for (sta, amps) in &record.site_amplification {
            let Some(response) = valid(amps.get(band).copied().flatten()) else {
                continue;
            };
            if !area.contains(sta) {
                continue;
            }
            if pinned_station.is_none() {
                let fac = 1.0 / station_counts[sta] as f64 / num_stations as f64;
                *norm_row.entry(k).or_insert(0.0) += fac;
                norm_rhs -= response.ln() * fac;
            }
            if pinned_station == Some(sta.as_str()) {
                builder.add_row([(k, 1.0)], reference_value.ln() - response.ln());
            } else if let Some(&(kl, last_response)) = last.get(sta.as_str()) {
                builder.add_row([(k, 1.0), (kl, -1.0)], last_response.ln() - response.ln());
                last.insert(sta.as_str(), (k, response));
            } else if let Some(&(kl, last_response)) = bridges
                .and_then(|map| map.get(sta.as_str()))
                .and_then(|partner| last.get(partner.as_str()))
            {
                // First sighting of this station, but its bridge partner was
                // already seen: couple the two former areas.
                builder.add_row([(k, 1.0), (kl, -1.0)], last_response.ln() - response.ln());
                last.insert(sta.as_str(), (k, response));
            } else {
                last.insert(sta.as_str(), (k, response));
            }
        }
    }

    if pinned_station.is_none() {
        norm_rhs += reference_value.ln();
        builder.add_row(norm_row, norm_rhs);
    }

    let system = builder.finish();
    debug!(
        "constructed {}coefficient matrix with shape ({}, {})",
        if system.is_sparse() { "sparse " } else { "" },
        system.rows,
        system.unknowns
    );
    system
}
