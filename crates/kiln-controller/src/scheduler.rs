//! Single-threaded step scheduler.

use crate::controller::SiteController;
use kiln_core::{ResultLog, SimError, SimulationState, TickId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Drives a [`SiteController`] one site per tick.
///
/// The runner owns the realization's RNG; site selection and every
/// stochastic choice inside the controller draw from it in tick order, so
/// a runner built from a given seed replays the same trajectory.
#[derive(Debug)]
pub struct StepRunner {
    rng: ChaCha8Rng,
    tick: TickId,
}

impl StepRunner {
    /// A runner seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self::from_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    /// A runner using an existing RNG.
    pub fn from_rng(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            tick: TickId(0),
        }
    }

    /// Ticks executed so far over the runner's lifetime.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// The runner's RNG, for callers that need draws between runs.
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Run `ticks` ticks from `initial`, recording one diff per tick
    /// (empty diffs included).
    ///
    /// Stops early without error if the controller selects no site.
    pub fn run(
        &mut self,
        controller: &mut dyn SiteController,
        initial: SimulationState,
        ticks: u64,
    ) -> Result<ResultLog, SimError> {
        let mut log = ResultLog::new(initial);
        for _ in 0..ticks {
            let state = log.final_state();
            let Some(site) = controller.select_site(state, &mut self.rng) else {
                log::debug!("{} selected no site at tick {}", controller.name(), self.tick);
                break;
            };
            let diff = controller.propose_update(site, state, &mut self.rng)?;
            log.push(diff)?;
            self.tick.0 += 1;
        }
        Ok(log)
    }

    /// Run up to `ticks` ticks mutating `state` directly, without a log.
    ///
    /// Returns the number of ticks whose diff changed something.
    pub fn run_in_place(
        &mut self,
        controller: &mut dyn SiteController,
        state: &mut SimulationState,
        ticks: u64,
    ) -> Result<u64, SimError> {
        let mut changed = 0;
        for _ in 0..ticks {
            let Some(site) = controller.select_site(state, &mut self.rng) else {
                break;
            };
            let diff = controller.propose_update(site, state, &mut self.rng)?;
            if !diff.is_empty() {
                state.apply(&diff)?;
                changed += 1;
            }
            self.tick.0 += 1;
        }
        Ok(changed)
    }
}
