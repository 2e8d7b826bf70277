//! Core types for the Kiln solid-state reaction automaton.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the per-site and general simulation state, the diff records through
//! which all state changes flow, the append-only result log, the weighted
//! sampling primitive shared by every stochastic decision, and the
//! runtime error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod diff;
pub mod error;
pub mod id;
pub mod log;
pub mod sample;
pub mod state;

pub use diff::{GeneralDiff, StateDiff};
pub use error::SimError;
pub use id::{SiteId, TickId};
pub use log::ResultLog;
pub use sample::{choose_weighted, normalize_weights};
pub use state::{GeneralState, PhaseVolumes, SimulationState, SiteState, FREE_SPACE};
