//! Top-level alignment pipeline.
//!
//! Each analysis run determines amplitudes only up to a multiplicative
//! constant, so the same station can carry different amplification values
//! in different runs. `align_site_responses` recovers one scale factor per
//! event and frequency band by solving a log-linear least-squares problem
//! over repeated observations of the same station, then applies the
//! factors to the result set in place.
//!
//! Typical usage:
//! ```no_run
//! use site_align::{align_site_responses, AlignOptions, ResultSet};
//!
//! # fn example(mut results: ResultSet) -> Result<(), site_align::AlignError> {
//! let report = align_site_responses(&mut results, None, &AlignOptions::default(), None)?;
//! println!("aligned {} events over {} bands", report.event_count, report.band_count);
//! # Ok(())
//! # }
//! ```

use crate::bridging::{join_unconnected_areas, BridgeMap};
use crate::connectivity::find_unconnected_areas;
use crate::diagnostics::{AlignmentReport, BandReport};
use crate::error::{AlignError, AlignResult};
use crate::inventory::CoordinateIndex;
use crate::rescale::rescale_results;
use crate::solver;
use crate::system::build_band_system;
use crate::types::{valid, FactorMatrix, ResultSet};
use log::info;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Downstream recomputation of source properties (seismic moment,
/// magnitude) from the rescaled energies. Implemented by the caller.
pub trait SourcePropertyModel {
    fn recompute(&self, results: &mut ResultSet);
}

/// Options controlling the alignment.
#[derive(Clone, Debug, Deserialize)]
pub struct AlignOptions {
    /// Pin this station's site response to `reference_value` instead of
    /// normalizing the geometric mean of all responses.
    pub pinned_station: Option<String>,
    /// Target response for the pinned station, or for the weighted
    /// geometric mean when no station is pinned.
    pub reference_value: f64,
    /// Solve with the sparse iterative solver. Forced off when only one
    /// event is present.
    pub use_sparse: bool,
    /// Merge unconnected areas closer than this distance. `None` disables
    /// bridging; enabling it requires a coordinate index.
    pub bridge_max_distance_km: Option<f64>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            pinned_station: None,
            reference_value: 1.0,
            use_sparse: true,
            bridge_max_distance_km: None,
        }
    }
}

/// Count, per station, the events with a valid observation at `band`.
fn station_counts(results: &ResultSet, band: usize) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in results.events.values() {
        for (sta, amps) in &record.site_amplification {
            if valid(amps.get(band).copied().flatten()).is_some() {
                *counts.entry(sta.clone()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// The area with the most stations; ties go to the earlier representative.
fn largest_area<'a>(
    areas: &'a BTreeMap<String, BTreeSet<String>>,
) -> Option<(&'a str, &'a BTreeSet<String>)> {
    let mut best: Option<(&str, &BTreeSet<String>)> = None;
    for (name, stations) in areas {
        if best.map_or(true, |(_, b)| stations.len() > b.len()) {
            best = Some((name.as_str(), stations));
        }
    }
    best
}

/// Align site responses across events and rescale the result set in place.
///
/// For every frequency band the pipeline discovers connected station
/// areas, optionally bridges geographically close ones, assembles the
/// log-linear system over the largest area and solves it for one scale
/// factor per event. Source energies are divided and site amplifications
/// multiplied by these factors, and `model` (when given) recomputes the
/// dependent source properties afterwards.
///
/// Returns a structured report of what happened per band.
pub fn align_site_responses(
    results: &mut ResultSet,
    coords: Option<&CoordinateIndex>,
    options: &AlignOptions,
    model: Option<&dyn SourcePropertyModel>,
) -> AlignResult<AlignmentReport> {
    let ne = results.event_count();
    let nf = results.band_count()?;
    if options.bridge_max_distance_km.is_some() && coords.is_none() {
        return Err(AlignError::Unsupported(
            "area bridging requires station coordinates".into(),
        ));
    }

    // A one-column sparse solve is degenerate; fall back to dense.
    let use_sparse = options.use_sparse && ne > 1;
    let pinned = options.pinned_station.as_deref();

    let mut factors: FactorMatrix = FactorMatrix::from_element(ne, nf, 1.0);
    let mut bands = Vec::with_capacity(nf);
    for band in 0..nf {
        info!("align sites for freq band {}", band);
        let areas = find_unconnected_areas(results, band);
        let area_sizes: Vec<usize> = areas.values().map(BTreeSet::len).collect();
        let area_count = areas.len();

        let mut bridge_map: Option<BridgeMap> = None;
        let mut links = Vec::new();
        let areas = match (options.bridge_max_distance_km, coords) {
            (Some(max_distance), Some(index)) if area_count > 1 => {
                let outcome = join_unconnected_areas(areas, max_distance, index)?;
                bridge_map = Some(outcome.near_stations);
                links = outcome.links;
                outcome.areas
            }
            _ => areas,
        };

        let Some((selected_name, selected)) = largest_area(&areas) else {
            // No valid observation anywhere at this band; factors stay 1.
            bands.push(BandReport {
                band,
                area_count: 0,
                area_sizes: Vec::new(),
                selected_area: String::new(),
                selected_stations: 0,
                bridges: Vec::new(),
                rows: 0,
                unknowns: ne,
                sparse: false,
            });
            continue;
        };
        info!(
            "use largest area {} with {} stations",
            selected_name,
            selected.len()
        );

        let counts = station_counts(results, band);
        let system = build_band_system(
            results,
            band,
            selected,
            bridge_map.as_ref(),
            &counts,
            pinned,
            options.reference_value,
            use_sparse,
        );
        let log_factors = solver::solve(&system);
        for k in 0..ne {
            factors[(k, band)] = log_factors[k].exp();
        }

        bands.push(BandReport {
            band,
            area_count,
            area_sizes,
            selected_area: selected_name.to_string(),
            selected_stations: selected.len(),
            bridges: links,
            rows: system.rows,
            unknowns: system.unknowns,
            sparse: system.is_sparse(),
        });
    }

    rescale_results(results, &factors);
    if let Some(model) = model {
        model.recompute(results);
    }

    Ok(AlignmentReport {
        event_count: ne,
        band_count: nf,
        bands,
    })
}
