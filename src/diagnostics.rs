//! Structured diagnostics emitted alongside the aligned result set.
//!
//! Everything the pipeline used to know only through log lines (area
//! counts, chosen area, system shape) is also returned here so callers can
//! inspect or serialize it.

use serde::Serialize;

/// One area merge performed by the bridger.
#[derive(Clone, Debug, Serialize)]
pub struct BridgeDiagnostics {
    pub area_a: String,
    pub area_b: String,
    /// Closest station pair achieving the minimum inter-area distance.
    pub station_a: String,
    pub station_b: String,
    pub distance_km: f64,
}

/// Per-frequency-band alignment trace.
#[derive(Clone, Debug, Serialize)]
pub struct BandReport {
    pub band: usize,
    /// Connected areas discovered before any bridging.
    pub area_count: usize,
    pub area_sizes: Vec<usize>,
    /// Representative station of the area fed into the system builder.
    pub selected_area: String,
    pub selected_stations: usize,
    pub bridges: Vec<BridgeDiagnostics>,
    /// Shape of the assembled least-squares system.
    pub rows: usize,
    pub unknowns: usize,
    pub sparse: bool,
}

/// Diagnostics for a full alignment invocation.
#[derive(Clone, Debug, Serialize)]
pub struct AlignmentReport {
    pub event_count: usize,
    pub band_count: usize,
    pub bands: Vec<BandReport>,
}
