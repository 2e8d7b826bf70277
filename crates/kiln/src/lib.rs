//! Kiln: a stochastic cellular-automaton simulation of solid-state synthesis.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Kiln sub-crates. For most users, adding `kiln` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use kiln::prelude::*;
//!
//! // Two unit-volume precursors that combine into one double-volume product.
//! let phases = PhaseSet::builder()
//!     .phase("A", 1.0)
//!     .phase("B", 1.0)
//!     .phase("AB", 2.0)
//!     .build()
//!     .unwrap();
//! let mut library = ReactionLibrary::new(Arc::new(phases));
//! let combine = Reaction::from_pairs(&[("A", 1.0), ("B", 1.0)], &[("AB", 2.0)], 1.0).unwrap();
//! library.add_reactions_at(800.0, vec![combine]).unwrap();
//!
//! // Hold a 1:1 mixture at 800 K for two sweeps of a 4×4×4 grid.
//! let mut recipe = ReactionRecipe::new(
//!     HeatingSchedule::hold(800.0, 2),
//!     [("A".to_string(), 1.0), ("B".to_string(), 1.0)].into_iter().collect(),
//!     4,
//! );
//! recipe.config.reaction_radius = 1;
//! let log = run_single(&recipe, Arc::new(library), None).unwrap();
//! assert_eq!(log.len(), 2 * 64);
//! assert_eq!(log.final_state().general.temperature, 800.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `kiln-core` | Ids, site and general state, diffs, result log, errors |
//! | [`space`] | `kiln-space` | Cubic lattice and neighbourhood graphs |
//! | [`catalog`] | `kiln-catalog` | Phases, formulas, reactions, temperature library |
//! | [`controller`] | `kiln-controller` | Site controllers, step scheduler, reaction rule |
//! | [`setup`] | `kiln-setup` | Nucleation, growth, volume tuning, analysis |
//! | [`engine`] | `kiln-engine` | Schedules, melt-and-regrind, realizations, recipes |
//! | [`replay`] | `kiln-replay` | JSON logs and checkpointed random access |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core state types, diffs and the result log (`kiln-core`).
///
/// All state changes flow through [`types::StateDiff`]; a run's history is
/// a [`types::ResultLog`].
pub use kiln_core as types;

/// Cubic lattice and neighbourhood graphs (`kiln-space`).
///
/// [`space::LatticeGraph`] precomputes each site's neighbours and distances
/// behind the [`space::NeighborGraph`] trait.
pub use kiln_space as space;

/// Phase and reaction catalogs (`kiln-catalog`).
///
/// A [`catalog::ReactionLibrary`] holds one [`catalog::ReactionSet`] per
/// temperature, all sharing one [`catalog::PhaseSet`].
pub use kiln_catalog as catalog;

/// Site controllers and the step scheduler (`kiln-controller`).
///
/// The [`controller::SiteController`] trait is the extension point for
/// custom update rules.
pub use kiln_controller as controller;

/// Initial grid construction and analysis (`kiln-setup`).
pub use kiln_setup as setup;

/// Heating schedules and realization drivers (`kiln-engine`).
pub use kiln_engine as engine;

/// Result-log persistence and random access (`kiln-replay`).
pub use kiln_replay as replay;

/// Common imports for typical Kiln usage.
///
/// ```rust
/// use kiln::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use kiln_core::{GeneralState, ResultLog, SimulationState, SiteId, SiteState, StateDiff, FREE_SPACE};

    // Errors
    pub use kiln_catalog::CatalogError;
    pub use kiln_core::SimError;
    pub use kiln_engine::{ConfigError, RunError};
    pub use kiln_replay::ReplayError;

    // Space
    pub use kiln_space::{CubicGrid, EdgeBehavior, LatticeGraph, NeighborGraph, Neighborhood};

    // Catalog
    pub use kiln_catalog::{PhaseSet, Reaction, ReactionLibrary, ReactionSet};

    // Controllers
    pub use kiln_controller::{ReactionCalculator, ReactionController, SiteController, StepRunner};

    // Setup
    pub use kiln_setup::{random_noise, ReactionPreparer, SetupConfig, StepAnalyzer};

    // Engine
    pub use kiln_engine::{
        run_parallel, run_single, HeatingSchedule, HeatingStage, MeltRegrind, ReactionRecipe,
        Realization, ScheduleRunner, SimulationConfig,
    };

    // Replay
    pub use kiln_replay::{read_log, write_log, LogWriter, StateIndex};
}
