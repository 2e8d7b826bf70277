//! Recipes: everything needed to reproduce a synthesis run.

use std::sync::Arc;

use indexmap::IndexMap;
use kiln_catalog::ReactionLibrary;
use kiln_core::{ResultLog, SimulationState};
use kiln_setup::ReactionPreparer;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SimulationConfig};
use crate::heating::HeatingSchedule;
use crate::realizations::{default_workers, run_realizations, Realization};
use crate::runner::{RunError, ScheduleRunner};

fn one() -> usize {
    1
}

/// A heating schedule, a precursor mixture and the simulation settings to
/// run it with.
///
/// `simulation_size` is the grid side length and overrides
/// [`SimulationConfig::side`].
///
/// # Examples
///
/// ```
/// use kiln_engine::ReactionRecipe;
///
/// let json = r#"{
///     "heating_schedule": [{"duration": 10, "temperature": 1200.0}],
///     "reactant_amounts": {"BaO": 1.0, "TiO2": 1.0},
///     "simulation_size": 8
/// }"#;
/// let recipe = ReactionRecipe::from_json(json).unwrap();
/// assert_eq!(recipe.num_realizations, 1);
/// assert_eq!(recipe.simulation_config().side, 8);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecipe {
    /// Stages to run.
    pub heating_schedule: HeatingSchedule,
    /// Molar amounts of each precursor phase.
    pub reactant_amounts: IndexMap<String, f64>,
    /// Grid side length.
    pub simulation_size: u32,
    /// Independent realizations to run. Default: 1.
    #[serde(default = "one")]
    pub num_realizations: usize,
    /// Remaining knobs.
    #[serde(default)]
    pub config: SimulationConfig,
}

impl ReactionRecipe {
    /// A single-realization recipe with default settings.
    pub fn new(
        heating_schedule: HeatingSchedule,
        reactant_amounts: IndexMap<String, f64>,
        simulation_size: u32,
    ) -> Self {
        Self {
            heating_schedule,
            reactant_amounts,
            simulation_size,
            num_realizations: 1,
            config: SimulationConfig::default(),
        }
    }

    /// The embedded configuration with `side` set to `simulation_size`.
    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            side: self.simulation_size,
            ..self.config.clone()
        }
    }

    /// Validate the recipe on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Settings, grid size included.
        self.simulation_config().validate()?;
        // 2. Schedule.
        self.heating_schedule.validate()?;
        // 3. Precursors.
        if let Some((phase, amount)) = self
            .reactant_amounts
            .iter()
            .find(|(_, n)| !(n.is_finite() && **n >= 0.0))
        {
            return Err(ConfigError::InvalidRecipe {
                reason: format!("amount of '{phase}' must be finite and >= 0, got {amount}"),
            });
        }
        if !self.reactant_amounts.values().any(|n| *n > 0.0) {
            return Err(ConfigError::InvalidRecipe {
                reason: "no reactant has a positive amount".to_string(),
            });
        }
        // 4. Realizations.
        if self.num_realizations == 0 {
            return Err(ConfigError::InvalidRecipe {
                reason: "num_realizations must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let recipe: Self = serde_json::from_str(json)?;
        recipe.validate()?;
        Ok(recipe)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn runner(&self, library: Arc<ReactionLibrary>) -> Result<ScheduleRunner, ConfigError> {
        self.validate()?;
        library.phases().mole_amounts_to_volumes(&self.reactant_amounts)?;
        let runner = ScheduleRunner::new(library, self.simulation_config())?;
        runner.check_schedule(&self.heating_schedule)?;
        Ok(runner)
    }

    fn prepare(&self, runner: &ScheduleRunner, seed: u64) -> Result<SimulationState, RunError> {
        let preparer = ReactionPreparer::new(Arc::clone(runner.library().phases()), runner.config().setup_config());
        Ok(preparer.prepare(&self.reactant_amounts, self.simulation_size, 1.0, seed)?)
    }
}

/// Run one realization of `recipe` with the configured seed.
///
/// Without an `initial` state the grid is prepared from the recipe's
/// reactant amounts first.
///
/// # Errors
///
/// [`RunError::Config`] if the recipe does not validate or does not match
/// `library`, and [`RunError::Sim`] if setup or the run fails.
pub fn run_single(
    recipe: &ReactionRecipe,
    library: Arc<ReactionLibrary>,
    initial: Option<SimulationState>,
) -> Result<ResultLog, RunError> {
    let runner = recipe.runner(library)?;
    let seed = runner.config().seed;
    let initial = match initial {
        Some(state) => state,
        None => recipe.prepare(&runner, seed)?,
    };
    runner.run(initial, &recipe.heating_schedule, seed)
}

/// Run `recipe.num_realizations` realizations in parallel.
///
/// Realization `i` is seeded with `seed ^ i`. Without an `initial` state
/// each realization prepares its own grid from that seed. Failed
/// realizations are logged and omitted from the result.
///
/// # Errors
///
/// [`RunError::Config`] if the recipe does not validate or does not match
/// `library`. Per-realization failures are not errors.
pub fn run_parallel(
    recipe: &ReactionRecipe,
    library: Arc<ReactionLibrary>,
    initial: Option<&SimulationState>,
) -> Result<Vec<Realization>, RunError> {
    let runner = recipe.runner(library)?;
    let count = recipe.num_realizations;
    let setup = |seed: u64| match initial {
        Some(state) => Ok(state.clone()),
        None => recipe.prepare(&runner, seed),
    };
    Ok(run_realizations(
        &runner,
        &recipe.heating_schedule,
        count,
        runner.config().seed,
        default_workers(count),
        setup,
    ))
}
