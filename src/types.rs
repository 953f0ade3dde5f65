//! Core data model shared by the alignment stages.
//!
//! A [`ResultSet`] collects the per-event output of independent analysis
//! runs: one source-energy value per frequency band, and one site
//! amplification value per station per band. Events are keyed in a
//! `BTreeMap`, so every stage that enumerates events (system assembly,
//! rescaling) sees the same deterministic order.
//!
//! Missing measurements are `None` or a stored NaN; both mean "no data" and
//! are skipped by every consumer via [`valid`].

use crate::error::{AlignError, AlignResult};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-event, per-band scale factors. Rows follow the `ResultSet` event
/// order, columns the frequency bands.
pub type FactorMatrix = DMatrix<f64>;

/// Result of a single event analysis across all frequency bands.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventRecord {
    /// Source energy per frequency band.
    pub source_energy: Vec<Option<f64>>,
    /// Station code -> site amplification per frequency band. Each vector
    /// has the same length as `source_energy`.
    pub site_amplification: BTreeMap<String, Vec<Option<f64>>>,
}

/// The combined output of several analysis runs, keyed by event identifier.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub events: BTreeMap<String, EventRecord>,
}

impl ResultSet {
    /// Number of events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of frequency bands, validated across all event records.
    ///
    /// Every record must report the same number of bands for both its
    /// energy vector and each of its amplification vectors; positional
    /// alignment across events is what makes per-band processing sound.
    pub fn band_count(&self) -> AlignResult<usize> {
        let mut expected: Option<usize> = None;
        for (evid, record) in &self.events {
            let nf = record.source_energy.len();
            match expected {
                None => expected = Some(nf),
                Some(e) if e != nf => {
                    return Err(AlignError::InconsistentBandCount {
                        event: evid.clone(),
                        expected: e,
                        found: nf,
                    })
                }
                Some(_) => {}
            }
            for amps in record.site_amplification.values() {
                if amps.len() != nf {
                    return Err(AlignError::InconsistentBandCount {
                        event: evid.clone(),
                        expected: nf,
                        found: amps.len(),
                    });
                }
            }
        }
        expected.ok_or(AlignError::EmptyResultSet)
    }
}

/// Collapses the two missing-data encodings into one: returns the value
/// only if it is present and finite.
#[inline]
pub fn valid(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
