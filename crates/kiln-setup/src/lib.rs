//! Initial grid construction for the Kiln reaction automaton.
//!
//! [`ReactionPreparer`] turns a target molar composition into a filled
//! grid in three stages:
//!
//! 1. **Nucleation**: seed cells are scattered in proportion to each
//!    phase's target volume fraction; every other cell starts free.
//! 2. **Growth**: [`GrowthController`] fills free cells from their
//!    occupied neighbours, always favouring the phase furthest below its
//!    target volume.
//! 3. **Tuning**: [`TuningController`] nudges individual cell volumes
//!    until every phase is within [`VolumeTolerance`] of its target.
//!
//! [`random_noise`] is a cheaper alternative that scatters phases
//! cell-by-cell. [`StepAnalyzer`] computes the volume, molar and
//! elemental breakdowns of any state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod analyzer;
pub mod growth;
pub mod noise;
pub mod preparer;
pub mod tuning;

pub use analyzer::StepAnalyzer;
pub use growth::GrowthController;
pub use noise::{random_noise, DEFAULT_PACKING_EFFICIENCY};
pub use preparer::{ReactionPreparer, SetupConfig};
pub use tuning::{TuningController, VolumeTolerance};
