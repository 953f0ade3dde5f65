//! Synthetic result sets with known ground truth.

use site_align::{EventRecord, ResultSet};
use std::collections::BTreeMap;

/// Build a result set from ground truth: every event carries an arbitrary
/// per-band scale `c^(band+1)` on top of the true per-station site
/// response, mimicking runs whose overall amplitude level is undetermined.
///
/// `events` entries are `(event id, scale c, observed stations)`; `sites`
/// maps station ids to their true responses.
pub fn synthetic_results(
    events: &[(&str, f64, &[&str])],
    sites: &[(&str, f64)],
    nf: usize,
) -> ResultSet {
    let site_map: BTreeMap<&str, f64> = sites.iter().copied().collect();
    let mut rs = ResultSet::default();
    for (evid, scale, observed) in events {
        let mut rec = EventRecord::default();
        for band in 0..nf {
            rec.source_energy
                .push(Some(100.0 * scale.powi(band as i32 + 1)));
        }
        for sta in *observed {
            let response = site_map[sta];
            let amps = (0..nf)
                .map(|band| Some(response * scale.powi(band as i32 + 1)))
                .collect();
            rec.site_amplification.insert(sta.to_string(), amps);
        }
        rs.events.insert(evid.to_string(), rec);
    }
    rs
}

/// Weighted geometric mean of all valid amplifications at `band`, with the
/// same weighting the normalization row uses: each observation counts
/// 1 / (events observing the station) / (number of observed stations).
pub fn weighted_geometric_mean(results: &ResultSet, band: usize) -> f64 {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in results.events.values() {
        for (sta, amps) in &record.site_amplification {
            if amps[band].is_some_and(|v| v.is_finite()) {
                *counts.entry(sta.as_str()).or_insert(0) += 1;
            }
        }
    }
    let num_stations = counts.len() as f64;
    let mut log_sum = 0.0;
    for record in results.events.values() {
        for (sta, amps) in &record.site_amplification {
            if let Some(value) = amps[band].filter(|v| v.is_finite()) {
                log_sum += value.ln() / counts[sta.as_str()] as f64 / num_stations;
            }
        }
    }
    log_sum.exp()
}
