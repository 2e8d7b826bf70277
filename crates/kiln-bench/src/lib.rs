//! Benchmark profiles for the Kiln reaction automaton.
//!
//! Every profile runs the Ba-Ti-O system at 1200 K from a 1:1 BaO/TiO2
//! mixture:
//!
//! - [`reference_profile`]: 10³ grid (1K cells), reaction radius 5
//! - [`stress_profile`]: 20³ grid (8K cells), reaction radius 3
//! - [`reference_recipe`]: the reference profile as a two-sweep recipe

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use indexmap::IndexMap;
use kiln_catalog::ReactionLibrary;
use kiln_core::{SimError, SimulationState};
use kiln_engine::{HeatingSchedule, ReactionRecipe, SimulationConfig};
use kiln_setup::ReactionPreparer;
use kiln_test_utils::fixtures::{ba_ti_o_library, BA_TI_O_TEMPERATURE};

/// 10³ cells, von Neumann radius 5, inertia 0.1.
pub fn reference_profile(seed: u64) -> SimulationConfig {
    SimulationConfig {
        side: 10,
        inertia: 0.1,
        reaction_radius: 5,
        seed,
        ..SimulationConfig::default()
    }
}

/// 20³ cells, von Neumann radius 3, inertia 0.1.
pub fn stress_profile(seed: u64) -> SimulationConfig {
    SimulationConfig {
        side: 20,
        reaction_radius: 3,
        ..reference_profile(seed)
    }
}

/// Equal moles of BaO and TiO2.
pub fn precursors() -> IndexMap<String, f64> {
    [("BaO".to_string(), 1.0), ("TiO2".to_string(), 1.0)]
        .into_iter()
        .collect()
}

/// The Ba-Ti-O library shared by every profile.
pub fn library() -> Arc<ReactionLibrary> {
    Arc::new(ba_ti_o_library())
}

/// Two sweeps of the reference profile at 1200 K.
pub fn reference_recipe(seed: u64) -> ReactionRecipe {
    let config = reference_profile(seed);
    let mut recipe = ReactionRecipe::new(
        HeatingSchedule::hold(BA_TI_O_TEMPERATURE, 2),
        precursors(),
        config.side,
    );
    recipe.config = config;
    recipe
}

/// A prepared precursor grid for `config`.
pub fn prepared_state(config: &SimulationConfig) -> Result<SimulationState, SimError> {
    let lib = library();
    ReactionPreparer::new(Arc::clone(lib.phases()), config.setup_config()).prepare(
        &precursors(),
        config.side,
        1.0,
        config.seed,
    )
}
