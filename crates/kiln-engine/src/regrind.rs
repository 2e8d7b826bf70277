//! Melt-and-regrind: separating liquid from solid at a stage transition.
//!
//! Melted material leaves the grid for the `melted_volumes` ledger, and
//! the remaining solid is rebuilt on a fresh grid of the same size under
//! a new volume multiplier chosen so the solid exactly fills it. Ledger
//! material that is solid again at the new temperature rejoins the grid.
//! Every per-phase absolute volume (grid plus ledger) is preserved.

use std::sync::Arc;

use kiln_catalog::PhaseSet;
use kiln_core::{PhaseVolumes, SimError, SimulationState};
use kiln_setup::{ReactionPreparer, SetupConfig, StepAnalyzer};

/// Melt-and-regrind transform over one phase catalog.
#[derive(Clone, Debug)]
pub struct MeltRegrind {
    preparer: ReactionPreparer,
    threshold: f64,
    rtol: f64,
}

impl MeltRegrind {
    /// Default melted fraction above which [`regrind`](Self::regrind)
    /// rebuilds the grid.
    pub const DEFAULT_THRESHOLD: f64 = 0.15;

    /// Default relative tolerance of the conservation check.
    pub const DEFAULT_RTOL: f64 = 0.011;

    /// A transform with default threshold and tolerance.
    pub fn new(phases: Arc<PhaseSet>, setup: SetupConfig) -> Self {
        Self {
            preparer: ReactionPreparer::new(phases, setup),
            threshold: Self::DEFAULT_THRESHOLD,
            rtol: Self::DEFAULT_RTOL,
        }
    }

    /// Set the regrind threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the relative tolerance of the conservation check.
    pub fn with_rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    /// The phase catalog.
    pub fn phases(&self) -> &Arc<PhaseSet> {
        self.preparer.phases()
    }

    fn analyzer(&self) -> StepAnalyzer<'_> {
        StepAnalyzer::new(self.preparer.phases())
    }

    /// Fraction of the grid's volume that is liquid at `temperature`.
    pub fn melted_fraction(&self, state: &SimulationState, temperature: f64) -> f64 {
        self.analyzer().melted_fraction(state, temperature)
    }

    /// Solid volume at `temperature` relative to the ideal grid volume.
    pub fn solid_ratio(&self, state: &SimulationState, temperature: f64) -> f64 {
        self.analyzer().solid_ratio(state, temperature)
    }

    /// Whether moving to `temperature` melts, or resolidifies, more than
    /// the threshold.
    pub fn needs_regrind(&self, state: &SimulationState, temperature: f64) -> bool {
        let an = self.analyzer();
        an.melted_fraction(state, temperature) > self.threshold
            || an.resolidified_fraction(state, temperature) > self.threshold
    }

    /// Move to `temperature`, regrinding only if
    /// [`needs_regrind`](Self::needs_regrind).
    ///
    /// Without a regrind the grid is untouched and only the temperature
    /// changes.
    ///
    /// # Errors
    ///
    /// Setup failures of the rebuilt grid, and
    /// [`SimError::Conservation`] if a phase's absolute volume drifts by
    /// more than the tolerance.
    pub fn regrind(
        &self,
        state: &SimulationState,
        temperature: f64,
        seed: u64,
    ) -> Result<SimulationState, SimError> {
        if self.needs_regrind(state, temperature) {
            log::info!(
                "melted fraction {:.3} at {temperature} K exceeds {}, regrinding",
                self.melted_fraction(state, temperature),
                self.threshold
            );
            self.full_regrind(state, temperature, seed)
        } else {
            let mut next = state.clone();
            next.general.temperature = temperature;
            Ok(next)
        }
    }

    /// Unconditionally separate and rebuild, then check conservation.
    pub fn full_regrind(
        &self,
        state: &SimulationState,
        temperature: f64,
        seed: u64,
    ) -> Result<SimulationState, SimError> {
        let next = self.separate_solid_and_melt(state, temperature, seed)?;
        self.check_conservation(state, &next)?;
        Ok(next)
    }

    /// Move liquid material to the melted ledger and rebuild the solid on
    /// a fresh grid of the same side length.
    ///
    /// The new volume multiplier is the old one times
    /// [`solid_ratio`](Self::solid_ratio). If nothing is solid the grid is
    /// left empty and the multiplier unchanged. Gas ledgers carry over.
    pub fn separate_solid_and_melt(
        &self,
        state: &SimulationState,
        temperature: f64,
        seed: u64,
    ) -> Result<SimulationState, SimError> {
        let an = self.analyzer();
        let side = an.simulation_side(state);
        if (side as usize).pow(3) != state.site_count() {
            return Err(SimError::Setup {
                reason: format!("{} sites do not form a cube", state.site_count()),
            });
        }
        let melted = an.absolute_melted_volumes(state, temperature);
        let solid: PhaseVolumes = an
            .absolute_solid_volumes(state, temperature)
            .into_iter()
            .filter(|(_, v)| *v > 0.0)
            .collect();
        let prev_mult = state.general.vol_multiplier;
        let solid_ratio = an.solid_ratio(state, temperature);
        log::debug!("melted {melted:?}, solid {solid:?}");

        let mut next = if solid.is_empty() {
            log::warn!("nothing is solid at {temperature} K, leaving the grid empty");
            let mut empty = SimulationState::all_free(state.site_count());
            empty.general.vol_multiplier = prev_mult;
            empty
        } else {
            let new_mult = prev_mult * solid_ratio;
            log::info!("volume multiplier {prev_mult} -> {new_mult} (solid ratio {solid_ratio})");
            let moles = self.phases().volume_amounts_to_moles(&solid)?;
            self.preparer.prepare(&moles, side, new_mult, seed)?
        };
        next.general.temperature = temperature;
        next.general.melted_volumes = melted;
        next.general.gases_evolved = state.general.gases_evolved.clone();
        next.general.gases_consumed = state.general.gases_consumed.clone();
        Ok(next)
    }

    /// Compare per-phase absolute volumes, ledger included, across a
    /// transform.
    pub fn check_conservation(
        &self,
        before: &SimulationState,
        after: &SimulationState,
    ) -> Result<(), SimError> {
        let old = before.absolute_phase_volumes();
        let new = after.absolute_phase_volumes();
        for (phase, &b) in &old {
            let a = new.get(phase).copied().unwrap_or(0.0);
            if !is_close(b, a, self.rtol) {
                return Err(SimError::Conservation {
                    phase: phase.clone(),
                    before: b,
                    after: a,
                });
            }
        }
        if let Some((phase, &a)) = new.iter().find(|(p, _)| !old.contains_key(*p)) {
            if !is_close(0.0, a, self.rtol) {
                return Err(SimError::Conservation {
                    phase: phase.clone(),
                    before: 0.0,
                    after: a,
                });
            }
        }
        Ok(())
    }
}

fn is_close(a: f64, b: f64, rtol: f64) -> bool {
    (a - b).abs() <= 1e-8 + rtol * b.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use kiln_core::{GeneralState, SiteState};
    use kiln_test_utils::assert_close;
    use kiln_test_utils::fixtures::staggered_melts;

    fn transform() -> MeltRegrind {
        MeltRegrind::new(staggered_melts(), SetupConfig::default())
    }

    fn thirds() -> SimulationState {
        let ratios: IndexMap<String, f64> = ["NaCl", "Li2O", "YMnO3"]
            .iter()
            .map(|p| (p.to_string(), 1.0))
            .collect();
        ReactionPreparer::new(staggered_melts(), SetupConfig::default())
            .prepare(&ratios, 6, 1.0, 1)
            .unwrap()
    }

    fn fractions(state: &SimulationState) -> PhaseVolumes {
        StepAnalyzer::new(&staggered_melts()).volume_fractions(state, false)
    }

    #[test]
    fn below_every_melting_point_is_a_no_op() {
        let t = transform();
        let state = thirds();
        let next = t.regrind(&state, 500.0, 3).unwrap();
        assert_eq!(next.sites, state.sites);
        assert_eq!(next.general.temperature, 500.0);
        assert!(!t.needs_regrind(&state, 500.0));
    }

    #[test]
    fn separating_in_two_steps() {
        let t = transform();
        let initial = thirds();
        let before = initial.absolute_phase_volumes();

        let one = t.separate_solid_and_melt(&initial, 650.0, 1).unwrap();
        assert_close(one.general.vol_multiplier, 2.0 / 3.0, 0.01);
        let f = fractions(&one);
        assert!(!f.contains_key("NaCl"));
        assert_close(f["Li2O"], 0.5, 0.01);
        assert_close(f["YMnO3"], 0.5, 0.01);

        let two = t.separate_solid_and_melt(&one, 750.0, 2).unwrap();
        assert_close(two.general.vol_multiplier, 1.0 / 3.0, 0.01);
        let f = fractions(&two);
        assert_eq!(f.len(), 1);
        assert_close(f["YMnO3"], 1.0, 1e-9);

        let after = two.absolute_phase_volumes();
        for phase in ["NaCl", "Li2O", "YMnO3"] {
            assert_close(after[phase], before[phase], 0.011);
        }
        assert_eq!(two.general.temperature, 750.0);
    }

    #[test]
    fn resolidify_restores_fractions() {
        let t = transform();
        let initial = thirds();
        let before = initial.absolute_phase_volumes();

        let melted = t.full_regrind(&initial, 750.0, 4).unwrap();
        assert_close(melted.general.vol_multiplier, 1.0 / 3.0, 0.01);

        // Ledger holds two thirds of the material; all of it freezes at 300 K.
        assert!(t.needs_regrind(&melted, 300.0));
        let solid = t.regrind(&melted, 300.0, 5).unwrap();
        assert_close(solid.general.vol_multiplier, 1.0, 0.01);
        assert!(solid.general.melted_volumes.is_empty());
        let f = fractions(&solid);
        for phase in ["NaCl", "Li2O", "YMnO3"] {
            assert_close(f[phase], 1.0 / 3.0, 0.01);
            assert_close(solid.absolute_phase_volumes()[phase], before[phase], 0.011);
        }
    }

    #[test]
    fn everything_melted_leaves_an_empty_grid() {
        let t = transform();
        let initial = thirds();
        let next = t.full_regrind(&initial, 900.0, 1).unwrap();
        assert!(next.phases_present().is_empty());
        assert_eq!(next.general.vol_multiplier, 1.0);
        assert_eq!(next.general.melted_volumes.len(), 3);
    }

    #[test]
    fn small_melt_stays_below_threshold() {
        // 1 of 27 cells melts at 650 K: under 15%, so nothing moves.
        let mut sites = vec![SiteState::new("YMnO3", 1.0); 27];
        sites[0] = SiteState::new("NaCl", 1.0);
        let state = SimulationState::new(sites, GeneralState::default());
        let t = transform();
        assert!(!t.needs_regrind(&state, 650.0));
        let next = t.regrind(&state, 650.0, 0).unwrap();
        assert_eq!(next.sites, state.sites);
        assert!(t.with_threshold(0.01).needs_regrind(&state, 650.0));
    }

    #[test]
    fn conservation_violation_is_reported() {
        let t = transform();
        let before = SimulationState::new(vec![SiteState::new("NaCl", 1.0); 8], GeneralState::default());
        let mut after = before.clone();
        after.sites[0] = SiteState::free();
        match t.check_conservation(&before, &after) {
            Err(SimError::Conservation { phase, before, after }) => {
                assert_eq!(phase, "NaCl");
                assert_eq!(before, 8.0);
                assert_eq!(after, 7.0);
            }
            other => panic!("expected Conservation, got {other:?}"),
        }
    }

    #[test]
    fn non_cubic_grid_is_rejected() {
        let t = transform();
        let state = SimulationState::new(vec![SiteState::new("NaCl", 1.0); 10], GeneralState::default());
        match t.separate_solid_and_melt(&state, 650.0, 0) {
            Err(SimError::Setup { .. }) => {}
            other => panic!("expected Setup, got {other:?}"),
        }
    }
}
