//! In-place application of the per-event, per-band scale factors.

use crate::types::{valid, FactorMatrix, ResultSet};
use log::debug;

/// Apply `factors` to the result set: source energy is divided by the
/// factor, every site amplification is multiplied by it, so the product
/// energy x amplification is invariant. Missing values stay missing.
///
/// Rows of `factors` must follow the same event enumeration order used
/// when the systems were built, which is the `ResultSet` map order.
pub fn rescale_results(results: &mut ResultSet, factors: &FactorMatrix) {
    debug!("scale events and site responses");
    for (k, record) in results.events.values_mut().enumerate() {
        for band in 0..record.source_energy.len() {
            let factor = factors[(k, band)];
            if let Some(energy) = valid(record.source_energy[band]) {
                record.source_energy[band] = Some(energy / factor);
            }
            for amps in record.site_amplification.values_mut() {
                if let Some(response) = valid(amps[band]) {
                    amps[band] = Some(response * factor);
                }
            }
        }
    }
}
