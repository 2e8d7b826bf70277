//! Drives one realization through a heating schedule.
//!
//! Each heat stage installs the reaction set for its temperature and runs
//! `duration × cell_count` ticks of the reaction controller. Between heat
//! stages the state is passed through [`MeltRegrind::regrind`], which
//! rebuilds the grid only when enough material changes state. The stage
//! logs are concatenated into one [`ResultLog`].

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use kiln_catalog::{CatalogError, ReactionLibrary};
use kiln_controller::{ReactionController, StepRunner};
use kiln_core::{ResultLog, SimError, SimulationState, StateDiff};
use kiln_space::LatticeGraph;
use rand::RngCore;

use crate::config::{ConfigError, SimulationConfig};
use crate::heating::{HeatingSchedule, HeatingStage};
use crate::regrind::MeltRegrind;

// ── RunError ───────────────────────────────────────────────────────

/// Errors from running a schedule.
#[derive(Clone, Debug, PartialEq)]
pub enum RunError {
    /// The configuration, schedule or catalog was rejected before the
    /// first tick.
    Config(ConfigError),
    /// The simulation failed mid-run.
    Sim(SimError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Sim(e) => write!(f, "simulation: {e}"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Sim(e) => Some(e),
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SimError> for RunError {
    fn from(e: SimError) -> Self {
        Self::Sim(e)
    }
}

impl From<CatalogError> for RunError {
    fn from(e: CatalogError) -> Self {
        Self::Config(ConfigError::Catalog(e))
    }
}

// ── ScheduleRunner ─────────────────────────────────────────────────

/// Runs realizations of a heating schedule over a fixed reaction library
/// and configuration.
///
/// The reaction graph is built once and shared by every run, so a runner
/// can be borrowed by many worker threads at once.
#[derive(Clone)]
pub struct ScheduleRunner {
    library: Arc<ReactionLibrary>,
    config: SimulationConfig,
    graph: Arc<LatticeGraph>,
    regrinder: MeltRegrind,
}

impl fmt::Debug for ScheduleRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleRunner")
            .field("temperatures", &self.library.temperatures())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScheduleRunner {
    /// Validate `config` and build the shared reaction graph.
    pub fn new(library: Arc<ReactionLibrary>, config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let graph = config.reaction_graph()?;
        let regrinder = MeltRegrind::new(Arc::clone(library.phases()), config.setup_config())
            .with_threshold(config.regrind_threshold)
            .with_rtol(config.conservation_rtol);
        Ok(Self {
            library,
            config,
            graph,
            regrinder,
        })
    }

    /// The reaction library.
    pub fn library(&self) -> &Arc<ReactionLibrary> {
        &self.library
    }

    /// The validated configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The melt-and-regrind transform applied between stages.
    pub fn regrinder(&self) -> &MeltRegrind {
        &self.regrinder
    }

    /// Check `schedule` against the library without running it.
    ///
    /// # Errors
    ///
    /// Schedule validation failures, and [`CatalogError::MissingTemperature`]
    /// (wrapped in [`ConfigError::Catalog`]) for any stage temperature
    /// without a reaction set.
    pub fn check_schedule(&self, schedule: &HeatingSchedule) -> Result<(), ConfigError> {
        schedule.validate()?;
        for t in schedule.all_temperatures() {
            self.library.get(t)?;
        }
        Ok(())
    }

    /// Run `schedule` from `initial` with RNG seed `seed`.
    ///
    /// The returned log starts at `initial` (with its temperature set to
    /// the first stage's when that stage is a heat stage) and holds one diff per tick plus one boundary
    /// diff per stage transition or regrind.
    ///
    /// # Errors
    ///
    /// - [`RunError::Config`] if the schedule fails
    ///   [`check_schedule`](Self::check_schedule) or `initial` does not
    ///   match the configured grid
    /// - [`RunError::Sim`] for any failure during a stage or regrind
    pub fn run(
        &self,
        initial: SimulationState,
        schedule: &HeatingSchedule,
        seed: u64,
    ) -> Result<ResultLog, RunError> {
        self.check_schedule(schedule)?;
        let n = self.config.cell_count();
        if initial.site_count() != n {
            return Err(ConfigError::InvalidRecipe {
                reason: format!(
                    "initial state has {} cells, side {} needs {n}",
                    initial.site_count(),
                    self.config.side
                ),
            }
            .into());
        }

        let mut controller = ReactionController::new(self.config.calculator(Arc::clone(&self.graph))?);
        let mut runner = StepRunner::new(seed);
        let mut current = initial;
        let mut log: Option<ResultLog> = None;

        for (index, stage) in schedule.stages().iter().enumerate() {
            match *stage {
                HeatingStage::Heat {
                    duration,
                    temperature,
                } => {
                    controller.set_reaction_catalog(Arc::clone(self.library.get(temperature)?));
                    controller.set_temperature(temperature);
                    let start = if log.is_some() {
                        let regrind_seed = runner.rng_mut().next_u64();
                        self.regrinder.regrind(&current, temperature, regrind_seed)?
                    } else {
                        let mut first = current.clone();
                        first.general.temperature = temperature;
                        first
                    };
                    log::info!(
                        "stage {index}: {duration} sweeps at {temperature} K, phases {:?}",
                        start.phases_present()
                    );
                    let stage_log = runner.run(&mut controller, start, duration * n as u64)?;
                    current = stage_log.final_state().clone();
                    log = Some(match log.take() {
                        Some(mut l) => {
                            l.extend_with(stage_log)?;
                            l
                        }
                        None => stage_log,
                    });
                }
                HeatingStage::Regrind => {
                    let temperature = current.general.temperature;
                    let regrind_seed = runner.rng_mut().next_u64();
                    log::info!("stage {index}: regrind at {temperature} K");
                    let next = self.regrinder.full_regrind(&current, temperature, regrind_seed)?;
                    let mut l = log.take().unwrap_or_else(|| ResultLog::new(current.clone()));
                    l.push(StateDiff::between(&current, &next))?;
                    log = Some(l);
                    current = next;
                }
            }
        }

        // check_schedule guarantees at least one heat stage.
        log.ok_or_else(|| ConfigError::EmptySchedule.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use kiln_catalog::{PhaseSet, Reaction};
    use kiln_core::{GeneralState, SiteState};
    use kiln_test_utils::fixtures::{balanced_ab_library, staggered_melts};

    fn ab_library(temperatures: &[f64]) -> Arc<ReactionLibrary> {
        Arc::new(balanced_ab_library(temperatures))
    }

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            side: 3,
            reaction_radius: 1,
            ..SimulationConfig::default()
        }
    }

    fn checkerboard() -> SimulationState {
        let sites = (0..27)
            .map(|i| SiteState::new(if i % 2 == 0 { "A" } else { "B" }, 1.0))
            .collect();
        SimulationState::new(sites, GeneralState::default())
    }

    #[test]
    fn runs_every_tick_of_every_stage() {
        let runner = ScheduleRunner::new(ab_library(&[500.0, 600.0]), small_config()).unwrap();
        let schedule = HeatingSchedule::hold(500.0, 2).then(HeatingSchedule::hold(600.0, 1));
        let log = runner.run(checkerboard(), &schedule, 7).unwrap();
        // 3 sweeps of 27 ticks plus one stage boundary.
        assert_eq!(log.len(), 3 * 27 + 1);
        assert_eq!(log.initial_state().general.temperature, 500.0);
        assert_eq!(log.final_state().general.temperature, 600.0);
    }

    #[test]
    fn same_seed_same_trace() {
        let runner = ScheduleRunner::new(ab_library(&[500.0]), small_config()).unwrap();
        let schedule = HeatingSchedule::hold(500.0, 3);
        let a = runner.run(checkerboard(), &schedule, 11).unwrap();
        let b = runner.run(checkerboard(), &schedule, 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_temperature_fails_before_running() {
        let runner = ScheduleRunner::new(ab_library(&[500.0]), small_config()).unwrap();
        let schedule = HeatingSchedule::hold(500.0, 1).then(HeatingSchedule::hold(650.0, 1));
        match runner.run(checkerboard(), &schedule, 0) {
            Err(RunError::Config(ConfigError::Catalog(CatalogError::MissingTemperature { .. }))) => {}
            other => panic!("expected MissingTemperature, got {other:?}"),
        }
    }

    #[test]
    fn wrong_grid_size_is_rejected() {
        let runner = ScheduleRunner::new(ab_library(&[500.0]), small_config()).unwrap();
        let state = SimulationState::new(vec![SiteState::new("A", 1.0); 8], GeneralState::default());
        match runner.run(state, &HeatingSchedule::hold(500.0, 1), 0) {
            Err(RunError::Config(ConfigError::InvalidRecipe { .. })) => {}
            other => panic!("expected InvalidRecipe, got {other:?}"),
        }
    }

    #[test]
    fn stage_transition_regrinds_a_melt() {
        // Three inert phases; NaCl melts between the two stages.
        let phases: Arc<PhaseSet> = staggered_melts();
        let mut lib = ReactionLibrary::new(Arc::clone(&phases));
        let none: Vec<Reaction> = Vec::new();
        lib.add_reactions_at(500.0, none.clone()).unwrap();
        lib.add_reactions_at(650.0, none).unwrap();
        let config = SimulationConfig {
            side: 6,
            reaction_radius: 1,
            ..SimulationConfig::default()
        };
        let runner = ScheduleRunner::new(Arc::new(lib), config.clone()).unwrap();
        let ratios: IndexMap<String, f64> = ["NaCl", "Li2O", "YMnO3"]
            .iter()
            .map(|p| (p.to_string(), 1.0))
            .collect();
        let initial = kiln_setup::ReactionPreparer::new(phases, config.setup_config())
            .prepare(&ratios, 6, 1.0, 2)
            .unwrap();
        let schedule = HeatingSchedule::hold(500.0, 1).then(HeatingSchedule::hold(650.0, 1));
        let log = runner.run(initial, &schedule, 3).unwrap();
        let last = log.final_state();
        assert!(!last.phases_present().contains(&"NaCl".to_string()));
        assert!(last.general.melted_volumes.contains_key("NaCl"));
        assert!((last.general.vol_multiplier - 2.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn leading_regrind_keeps_the_initial_state() {
        let runner = ScheduleRunner::new(ab_library(&[500.0]), small_config()).unwrap();
        let schedule =
            HeatingSchedule::new(vec![HeatingStage::Regrind]).then(HeatingSchedule::hold(500.0, 1));
        let initial = checkerboard();
        let log = runner.run(initial.clone(), &schedule, 4).unwrap();
        assert_eq!(log.initial_state(), &initial);
        // One regrind diff, one stage boundary, then 27 ticks.
        assert_eq!(log.len(), 1 + 1 + 27);
        assert_eq!(log.final_state().general.temperature, 500.0);
    }

    #[test]
    fn regrind_marker_rebuilds_in_place() {
        let runner = ScheduleRunner::new(ab_library(&[500.0]), small_config()).unwrap();
        let schedule = HeatingSchedule::hold(500.0, 1).regrind();
        let log = runner.run(checkerboard(), &schedule, 5).unwrap();
        assert_eq!(log.len(), 27 + 1);
        let before = log.state_at(27).unwrap().absolute_phase_volumes();
        let after = log.final_state().absolute_phase_volumes();
        for (phase, v) in &before {
            assert!((after[phase] - v).abs() <= 0.011 * v + 1e-8, "{phase} drifted");
        }
    }
}
