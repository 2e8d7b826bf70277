//! Cell-volume tuning towards exact per-phase targets.

use indexmap::IndexMap;
use kiln_controller::SiteController;
use kiln_core::{PhaseVolumes, SimError, SimulationState, SiteId, SiteState, StateDiff};
use rand::{Rng, RngCore};

/// Absolute and relative closeness required of every phase volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeTolerance {
    /// Maximum absolute deviation from the target volume.
    pub absolute: f64,
    /// Maximum deviation as a fraction of the target volume.
    pub relative: f64,
}

impl Default for VolumeTolerance {
    fn default() -> Self {
        Self {
            absolute: 0.1,
            relative: 0.005,
        }
    }
}

impl VolumeTolerance {
    /// Whether `actual` is within both tolerances of `target`.
    pub fn accepts(&self, actual: f64, target: f64) -> bool {
        let gap = (actual - target).abs();
        gap <= self.absolute && (target == 0.0 || gap / target.abs() <= self.relative)
    }

    /// The phase furthest from its target and its absolute deviation, or
    /// `None` if every phase is accepted.
    pub fn worst(&self, actual: &PhaseVolumes, targets: &PhaseVolumes) -> Option<(String, f64)> {
        targets
            .iter()
            .map(|(p, t)| (p, actual.get(p).copied().unwrap_or(0.0), *t))
            .filter(|(_, a, t)| !self.accepts(*a, *t))
            .map(|(p, a, t)| (p.clone(), (a - t).abs()))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Nudges cell volumes of off-target phases by up to [`TuningController::STEP`].
///
/// Only cells of phases outside tolerance are selected. A selected cell
/// grows if its phase is below target and shrinks if above, by 1% of its
/// volume or by the remaining gap, whichever is smaller. Site selection
/// stops once every phase is accepted.
///
/// Like [`GrowthController`](crate::GrowthController), the controller
/// tracks running totals and assumes its diffs are applied.
pub struct TuningController {
    targets: PhaseVolumes,
    current: PhaseVolumes,
    tolerance: VolumeTolerance,
    vol_multiplier: f64,
    cells: IndexMap<String, Vec<SiteId>>,
}

impl TuningController {
    /// Largest relative change applied to one cell per tick.
    pub const STEP: f64 = 0.01;

    /// A controller tuning `state` towards absolute `targets`.
    pub fn new(targets: PhaseVolumes, tolerance: VolumeTolerance, state: &SimulationState) -> Self {
        let mut cells: IndexMap<String, Vec<SiteId>> = IndexMap::new();
        for (i, site) in state.sites.iter().enumerate() {
            if !site.is_free() {
                cells.entry(site.phase.clone()).or_default().push(SiteId(i as u32));
            }
        }
        Self {
            targets,
            current: state.absolute_grid_volumes(),
            tolerance,
            vol_multiplier: state.general.vol_multiplier,
            cells,
        }
    }

    /// Whether every phase is within tolerance.
    pub fn converged(&self) -> bool {
        self.worst().is_none()
    }

    /// The phase furthest from its target, if any is outside tolerance.
    pub fn worst(&self) -> Option<(String, f64)> {
        self.tolerance.worst(&self.current, &self.targets)
    }

    fn gap(&self, phase: &str) -> f64 {
        self.targets.get(phase).copied().unwrap_or(0.0) - self.current.get(phase).copied().unwrap_or(0.0)
    }
}

impl SiteController for TuningController {
    fn name(&self) -> &str {
        "TuningController"
    }

    fn select_site(&mut self, _state: &SimulationState, rng: &mut dyn RngCore) -> Option<SiteId> {
        let off: Vec<&Vec<SiteId>> = self
            .targets
            .iter()
            .filter(|(p, t)| !self.tolerance.accepts(self.current.get(*p).copied().unwrap_or(0.0), **t))
            .filter_map(|(p, _)| self.cells.get(p))
            .collect();
        let total: usize = off.iter().map(|c| c.len()).sum();
        if total == 0 {
            return None;
        }
        let mut k = rng.gen_range(0..total);
        for cells in off {
            if k < cells.len() {
                return Some(cells[k]);
            }
            k -= cells.len();
        }
        None
    }

    fn propose_update(
        &mut self,
        site: SiteId,
        state: &SimulationState,
        _rng: &mut dyn RngCore,
    ) -> Result<StateDiff, SimError> {
        let mut diff = StateDiff::empty();
        let cell = state.try_site(site)?;
        if cell.is_free() || self.vol_multiplier <= 0.0 {
            return Ok(diff);
        }
        let gap = self.gap(&cell.phase) / self.vol_multiplier;
        let change = gap.signum() * (cell.volume * Self::STEP).min(gap.abs());
        if change == 0.0 {
            return Ok(diff);
        }
        *self.current.entry(cell.phase.clone()).or_insert(0.0) += change * self.vol_multiplier;
        diff.set_site(site, SiteState::new(cell.phase.clone(), cell.volume + change));
        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_controller::StepRunner;
    use kiln_test_utils::grid_of;

    fn targets(pairs: &[(&str, f64)]) -> PhaseVolumes {
        pairs.iter().map(|(p, v)| (p.to_string(), *v)).collect()
    }

    #[test]
    fn tolerance_needs_both_bounds() {
        let tol = VolumeTolerance::default();
        assert!(tol.accepts(100.0, 100.05));
        // Within 0.5% but off by more than 0.1.
        assert!(!tol.accepts(100.0, 100.3));
        // Within 0.1 but off by more than 0.5%.
        assert!(!tol.accepts(1.0, 1.06));
        assert!(tol.accepts(0.0, 0.0));
    }

    #[test]
    fn worst_reports_largest_deviation() {
        let tol = VolumeTolerance::default();
        let actual = targets(&[("A", 10.0), ("B", 7.0)]);
        let (phase, dev) = tol.worst(&actual, &targets(&[("A", 10.0), ("B", 9.0)])).unwrap();
        assert_eq!(phase, "B");
        assert!((dev - 2.0).abs() < 1e-12);
        assert!(tol.worst(&actual, &actual).is_none());
    }

    #[test]
    fn grows_deficient_and_shrinks_excess() {
        let state = grid_of(&[("A", 1.0), ("B", 1.0)]);
        let mut tuner = TuningController::new(
            targets(&[("A", 2.0), ("B", 0.5)]),
            VolumeTolerance::default(),
            &state,
        );
        let mut rng = rand::rngs::mock::StepRng::new(0, 0);
        let up = tuner.propose_update(SiteId(0), &state, &mut rng).unwrap();
        assert!((up.sites[&SiteId(0)].volume - 1.01).abs() < 1e-12);
        let down = tuner.propose_update(SiteId(1), &state, &mut rng).unwrap();
        assert!((down.sites[&SiteId(1)].volume - 0.99).abs() < 1e-12);
    }

    #[test]
    fn never_overshoots_a_small_gap() {
        let state = grid_of(&[("A", 1.0)]);
        let mut tuner = TuningController::new(targets(&[("A", 1.004)]), VolumeTolerance::default(), &state);
        let mut rng = rand::rngs::mock::StepRng::new(0, 0);
        let diff = tuner.propose_update(SiteId(0), &state, &mut rng).unwrap();
        assert!((diff.sites[&SiteId(0)].volume - 1.004).abs() < 1e-12);
        assert!(tuner.converged());
    }

    #[test]
    fn runs_until_converged_then_stops() {
        let mut state = grid_of(&[("A", 1.0); 10].iter().chain(&[("B", 1.0); 10]).copied().collect::<Vec<_>>());
        let goal = targets(&[("A", 10.7), ("B", 9.2)]);
        let mut tuner = TuningController::new(goal.clone(), VolumeTolerance::default(), &state);
        StepRunner::new(2).run_in_place(&mut tuner, &mut state, 100_000).unwrap();
        assert!(tuner.converged());
        assert!(VolumeTolerance::default().worst(&state.absolute_grid_volumes(), &goal).is_none());
    }
}
