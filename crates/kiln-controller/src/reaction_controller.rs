//! Binds the [`ReactionCalculator`] to the step scheduler.

use crate::calculator::ReactionCalculator;
use crate::controller::SiteController;
use kiln_catalog::ReactionSet;
use kiln_core::{SimError, SimulationState, SiteId, StateDiff};
use rand::RngCore;
use std::sync::Arc;

/// A [`SiteController`] that applies the reaction rule at uniformly
/// chosen sites.
///
/// The reaction catalog is swapped once per heating stage with
/// [`set_reaction_catalog`](Self::set_reaction_catalog). The temperature
/// is bookkeeping only; the catalog already encodes it.
pub struct ReactionController {
    calculator: ReactionCalculator,
    temperature: Option<f64>,
}

impl ReactionController {
    /// Wrap a calculator.
    pub fn new(calculator: ReactionCalculator) -> Self {
        Self {
            calculator,
            temperature: None,
        }
    }

    /// Install the reaction set for the next stage.
    pub fn set_reaction_catalog(&mut self, reactions: Arc<ReactionSet>) {
        self.calculator.set_reactions(reactions);
    }

    /// Record the temperature of the current stage.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = Some(temperature);
    }

    /// The last recorded temperature.
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// The wrapped calculator.
    pub fn calculator(&self) -> &ReactionCalculator {
        &self.calculator
    }
}

impl SiteController for ReactionController {
    fn name(&self) -> &str {
        "ReactionController"
    }

    fn propose_update(
        &mut self,
        site: SiteId,
        state: &SimulationState,
        rng: &mut dyn RngCore,
    ) -> Result<StateDiff, SimError> {
        self.calculator.propose_update(site, state, rng)
    }
}
