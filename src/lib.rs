//! Align site amplification estimates across independent analysis runs.
//!
//! Consider two runs with stations A, B in run 1 and stations B, C in
//! run 2. Each run fixes its own overall amplitude scale arbitrarily, so
//! station B ends up with two incompatible amplification values. This
//! crate recovers one multiplicative factor per event and frequency band
//! such that repeated observations of the same station agree, then
//! rescales source energies and site amplifications consistently.
//!
//! Overview
//! - [`connectivity`] partitions stations into connected areas per band.
//! - [`bridging`] optionally merges geographically close areas using a
//!   convex-hull-reduced nearest-pair search.
//! - [`system`] assembles a log-linear least-squares system over the
//!   selected area, with either a pinned-station or a geometric-mean
//!   normalization row.
//! - [`solver`] solves it (sparse LSMR or dense SVD), tolerating
//!   rank-deficient systems.
//! - [`rescale`] applies the factors to the result set in place.
//!
//! The entry point is [`align_site_responses`].

pub mod align;
pub mod bridging;
pub mod connectivity;
pub mod diagnostics;
pub mod error;
pub mod geo;
pub mod inventory;
pub mod rescale;
pub mod solver;
pub mod system;
pub mod types;

// --- High-level re-exports -------------------------------------------------

pub use crate::align::{align_site_responses, AlignOptions, SourcePropertyModel};
pub use crate::diagnostics::{AlignmentReport, BandReport, BridgeDiagnostics};
pub use crate::error::{AlignError, AlignResult};
pub use crate::inventory::{CoordinateIndex, GeoPoint, Inventory};
pub use crate::types::{EventRecord, FactorMatrix, ResultSet};

/// Small prelude for quick experiments.
pub mod prelude {
    pub use crate::align::{align_site_responses, AlignOptions};
    pub use crate::inventory::CoordinateIndex;
    pub use crate::types::{EventRecord, ResultSet};
}
