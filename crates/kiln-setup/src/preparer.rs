//! Three-stage construction of an initial grid from a molar composition.

use std::sync::Arc;

use indexmap::IndexMap;
use kiln_catalog::PhaseSet;
use kiln_controller::StepRunner;
use kiln_core::{GeneralState, PhaseVolumes, SimError, SimulationState, SiteId, SiteState};
use kiln_space::{CubicGrid, EdgeBehavior, LatticeGraph, Neighborhood};
use rand::seq::SliceRandom;

use crate::growth::GrowthController;
use crate::tuning::{TuningController, VolumeTolerance};

/// Knobs of [`ReactionPreparer`].
#[derive(Clone, Debug, PartialEq)]
pub struct SetupConfig {
    /// Closeness required of every phase's absolute volume.
    pub tolerance: VolumeTolerance,
    /// Tuning rounds attempted before giving up.
    pub max_tuning_rounds: usize,
    /// Cells per nucleation seed.
    pub cells_per_seed: usize,
    /// Neighbourhood over which grains grow.
    pub growth_neighborhood: Neighborhood,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            tolerance: VolumeTolerance::default(),
            max_tuning_rounds: 15,
            cells_per_seed: 20,
            growth_neighborhood: Neighborhood::Moore { radius: 1 },
        }
    }
}

/// Builds filled grids whose phase volumes match a molar composition.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use indexmap::IndexMap;
/// use kiln_catalog::PhaseSet;
/// use kiln_setup::{ReactionPreparer, SetupConfig};
///
/// let phases = Arc::new(
///     PhaseSet::builder().phase("A", 1.0).phase("B", 2.0).build().unwrap(),
/// );
/// let preparer = ReactionPreparer::new(phases, SetupConfig::default());
/// let ratios: IndexMap<String, f64> = [("A".to_string(), 1.0), ("B".to_string(), 1.0)]
///     .into_iter()
///     .collect();
/// let state = preparer.prepare(&ratios, 5, 1.0, 42).unwrap();
/// assert_eq!(state.site_count(), 125);
/// assert!(state.free_sites().is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct ReactionPreparer {
    phases: Arc<PhaseSet>,
    config: SetupConfig,
}

impl ReactionPreparer {
    /// A preparer over `phases`.
    pub fn new(phases: Arc<PhaseSet>, config: SetupConfig) -> Self {
        Self { phases, config }
    }

    /// The phase catalog.
    pub fn phases(&self) -> &Arc<PhaseSet> {
        &self.phases
    }

    /// The configuration.
    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// Absolute target volume per phase for `mole_ratios` on a grid of
    /// `cell_count` cells at `vol_multiplier`.
    ///
    /// Phases with zero amount are dropped.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownPhase`] for phases missing from the catalog and
    /// [`SimError::Setup`] for negative, non-finite or all-zero amounts.
    pub fn target_volumes(
        &self,
        mole_ratios: &IndexMap<String, f64>,
        cell_count: usize,
        vol_multiplier: f64,
    ) -> Result<PhaseVolumes, SimError> {
        if let Some((p, n)) = mole_ratios.iter().find(|(_, n)| !(n.is_finite() && **n >= 0.0)) {
            return Err(SimError::Setup {
                reason: format!("amount of '{p}' must be finite and >= 0, got {n}"),
            });
        }
        let volumes = self.phases.mole_amounts_to_volumes(mole_ratios)?;
        let total: f64 = volumes.values().sum();
        if total <= 0.0 {
            return Err(SimError::Setup {
                reason: "composition has no material".to_string(),
            });
        }
        let available = cell_count as f64 * vol_multiplier;
        Ok(volumes
            .into_iter()
            .filter(|(_, v)| *v > 0.0)
            .map(|(p, v)| (p, v / total * available))
            .collect())
    }

    /// Build a filled `side`³ grid matching `mole_ratios`, with
    /// general state `vol_multiplier` and empty ledgers.
    ///
    /// # Errors
    ///
    /// - [`SimError::Setup`] for an invalid composition, a grid smaller
    ///   than the number of phases, or a growth pass that fills nothing
    /// - [`SimError::Convergence`] if tuning exhausts its rounds
    pub fn prepare(
        &self,
        mole_ratios: &IndexMap<String, f64>,
        side: u32,
        vol_multiplier: f64,
        seed: u64,
    ) -> Result<SimulationState, SimError> {
        if !(vol_multiplier.is_finite() && vol_multiplier > 0.0) {
            return Err(SimError::Setup {
                reason: format!("volume multiplier must be positive, got {vol_multiplier}"),
            });
        }
        let grid = CubicGrid::new(side, EdgeBehavior::Wrap).map_err(|e| SimError::Setup {
            reason: e.to_string(),
        })?;
        let n = grid.cell_count();
        let targets = self.target_volumes(mole_ratios, n, vol_multiplier)?;
        if targets.len() > n {
            return Err(SimError::Setup {
                reason: format!("{} phases cannot fit in {n} cells", targets.len()),
            });
        }

        let mut runner = StepRunner::new(seed);
        let mut state = SimulationState::all_free(n);
        state.general = GeneralState {
            vol_multiplier,
            ..GeneralState::default()
        };

        // ── Nucleation ──────────────────────────────────────────
        let n_seeds = (n / self.config.cells_per_seed.max(1)).max(targets.len());
        let available = n as f64 * vol_multiplier;
        let fractions: Vec<(String, f64)> = targets.iter().map(|(p, v)| (p.clone(), v / available)).collect();
        let mut order: Vec<SiteId> = grid.sites().collect();
        order.shuffle(runner.rng_mut());
        let seeds = seed_counts(&fractions, n_seeds)
            .into_iter()
            .flat_map(|(p, k)| std::iter::repeat(p).take(k));
        for (site, phase) in order.iter().zip(seeds) {
            state.sites[site.index()] = SiteState::new(phase, 1.0);
        }
        log::info!("nucleated {n_seeds} seeds on a {side}^3 grid, targets {targets:?}");

        // ── Growth ──────────────────────────────────────────────
        let graph = Arc::new(
            LatticeGraph::build(&grid, self.config.growth_neighborhood).map_err(|e| SimError::Setup {
                reason: e.to_string(),
            })?,
        );
        let mut growth = GrowthController::new(graph, targets.clone(), &state);
        let pass = (3 * n / 2).max(1) as u64;
        while growth.vacant_count() > 0 {
            let before = growth.vacant_count();
            log::debug!("filling {before} vacant cells");
            runner.run_in_place(&mut growth, &mut state, pass)?;
            if growth.vacant_count() == before {
                return Err(SimError::Setup {
                    reason: format!("growth pass filled none of {before} vacant cells"),
                });
            }
        }

        // ── Tuning ──────────────────────────────────────────────
        let mut tuner = TuningController::new(targets, self.config.tolerance, &state);
        let round = (5 * n).max(1) as u64;
        let mut rounds = 0;
        while let Some((phase, deviation)) = tuner.worst() {
            if rounds == self.config.max_tuning_rounds {
                return Err(SimError::Convergence {
                    phase,
                    deviation,
                    rounds,
                });
            }
            log::debug!("tuning round {rounds}: '{phase}' off target by {deviation}");
            runner.run_in_place(&mut tuner, &mut state, round)?;
            rounds += 1;
        }
        log::info!("grid converged after {rounds} tuning rounds");
        Ok(state)
    }
}

/// Split `total` seeds across phases in proportion to their fractions,
/// with at least one seed per phase; leftovers go to the largest
/// fractional parts.
fn seed_counts(fractions: &[(String, f64)], total: usize) -> Vec<(String, usize)> {
    let exact: Vec<f64> = fractions.iter().map(|(_, f)| f * total as f64).collect();
    let mut counts: Vec<usize> = exact.iter().map(|x| (x.floor() as usize).max(1)).collect();
    let assigned: usize = counts.iter().sum();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| exact[b].fract().total_cmp(&exact[a].fract()));
    for &i in order.iter().cycle().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    fractions
        .iter()
        .zip(counts)
        .map(|((p, _), k)| (p.clone(), k))
        .collect()
}
