//! Volume, molar and elemental breakdowns of a simulation state.

use indexmap::IndexMap;
use kiln_catalog::{CatalogError, PhaseSet};
use kiln_core::{PhaseVolumes, SimulationState};

/// Read-only analysis of [`SimulationState`]s against a phase catalog.
///
/// "Raw" volumes are the nominal per-cell volumes stored on the grid;
/// "absolute" volumes are raw volumes scaled by the state's volume
/// multiplier, which is the unit the melted and gas ledgers use.
#[derive(Clone, Copy, Debug)]
pub struct StepAnalyzer<'a> {
    phases: &'a PhaseSet,
}

impl<'a> StepAnalyzer<'a> {
    /// An analyzer over `phases`.
    pub fn new(phases: &'a PhaseSet) -> Self {
        Self { phases }
    }

    /// The phase catalog.
    pub fn phases(&self) -> &'a PhaseSet {
        self.phases
    }

    // ── Volumes ─────────────────────────────────────────────────

    /// Raw grid volume per phase, free space excluded.
    pub fn phase_volumes(&self, state: &SimulationState) -> PhaseVolumes {
        state.grid_volumes()
    }

    /// Sum of raw grid volumes.
    pub fn total_volume(&self, state: &SimulationState) -> f64 {
        state.grid_volumes().values().sum()
    }

    /// Absolute volume per phase, optionally including the melted ledger.
    pub fn absolute_phase_volumes(&self, state: &SimulationState, include_melted: bool) -> PhaseVolumes {
        if include_melted {
            state.absolute_phase_volumes()
        } else {
            state.absolute_grid_volumes()
        }
    }

    /// Sum of absolute volumes, optionally including the melted ledger.
    pub fn total_absolute_volume(&self, state: &SimulationState, include_melted: bool) -> f64 {
        self.absolute_phase_volumes(state, include_melted).values().sum()
    }

    /// Fraction of the total absolute volume held by each phase.
    pub fn volume_fractions(&self, state: &SimulationState, include_melted: bool) -> PhaseVolumes {
        normalized(self.absolute_phase_volumes(state, include_melted))
    }

    /// Absolute volume the grid would hold if every cell had unit volume.
    pub fn ideal_grid_volume(&self, state: &SimulationState) -> f64 {
        state.site_count() as f64 * state.general.vol_multiplier
    }

    /// Side length of the cubic grid holding `state`.
    pub fn simulation_side(&self, state: &SimulationState) -> u32 {
        (state.site_count() as f64).cbrt().round() as u32
    }

    // ── Melting ─────────────────────────────────────────────────

    /// Absolute volume per phase, grid and ledger combined, of phases that
    /// are liquid at `temperature`.
    pub fn absolute_melted_volumes(&self, state: &SimulationState, temperature: f64) -> PhaseVolumes {
        self.absolute_phase_volumes(state, true)
            .into_iter()
            .filter(|(p, _)| self.phases.is_melted(p, temperature))
            .collect()
    }

    /// Absolute volume per phase, grid and ledger combined, of phases that
    /// are solid at `temperature`.
    pub fn absolute_solid_volumes(&self, state: &SimulationState, temperature: f64) -> PhaseVolumes {
        self.absolute_phase_volumes(state, true)
            .into_iter()
            .filter(|(p, _)| !self.phases.is_melted(p, temperature))
            .collect()
    }

    /// Total absolute volume that is solid at `temperature`.
    pub fn total_solid_volume(&self, state: &SimulationState, temperature: f64) -> f64 {
        self.absolute_solid_volumes(state, temperature).values().sum()
    }

    /// Fraction of the grid's own volume (ledger excluded) held by phases
    /// that are liquid at `temperature`.
    pub fn melted_fraction(&self, state: &SimulationState, temperature: f64) -> f64 {
        self.volume_fractions(state, false)
            .iter()
            .filter(|(p, _)| self.phases.is_melted(p, temperature))
            .map(|(_, f)| f)
            .sum()
    }

    /// Fraction of the ledger's volume that is solid at `temperature`,
    /// relative to the ideal grid volume.
    pub fn resolidified_fraction(&self, state: &SimulationState, temperature: f64) -> f64 {
        let ideal = self.ideal_grid_volume(state);
        if ideal <= 0.0 {
            return 0.0;
        }
        let solid: f64 = state
            .general
            .melted_volumes
            .iter()
            .filter(|(p, _)| !self.phases.is_melted(p, temperature))
            .map(|(_, v)| v)
            .sum();
        solid / ideal
    }

    /// Solid volume at `temperature` relative to the ideal grid volume.
    ///
    /// Multiplying the current volume multiplier by this ratio gives the
    /// multiplier under which the solid material exactly fills the grid.
    pub fn solid_ratio(&self, state: &SimulationState, temperature: f64) -> f64 {
        let ideal = self.ideal_grid_volume(state);
        if ideal <= 0.0 {
            return 0.0;
        }
        self.total_solid_volume(state, temperature) / ideal
    }

    // ── Composition ─────────────────────────────────────────────

    /// Moles of each phase.
    pub fn molar_breakdown(
        &self,
        state: &SimulationState,
        include_melted: bool,
    ) -> Result<IndexMap<String, f64>, CatalogError> {
        self.phases
            .volume_amounts_to_moles(&self.absolute_phase_volumes(state, include_melted))
    }

    /// Mole fraction of each phase.
    pub fn molar_fractions(
        &self,
        state: &SimulationState,
        include_melted: bool,
    ) -> Result<IndexMap<String, f64>, CatalogError> {
        Ok(normalized(self.molar_breakdown(state, include_melted)?))
    }

    /// Moles of each element.
    pub fn elemental_composition(
        &self,
        state: &SimulationState,
        include_melted: bool,
    ) -> Result<IndexMap<String, f64>, CatalogError> {
        self.phases
            .mole_amounts_to_element_amounts(&self.molar_breakdown(state, include_melted)?)
    }

    /// Mole fraction of each element.
    pub fn elemental_fractions(
        &self,
        state: &SimulationState,
        include_melted: bool,
    ) -> Result<IndexMap<String, f64>, CatalogError> {
        self.phases
            .mole_amounts_to_element_fractions(&self.molar_breakdown(state, include_melted)?)
    }

    /// Distinct phases occupying at least one cell.
    pub fn phases_present(&self, state: &SimulationState) -> Vec<String> {
        state.phases_present()
    }

    /// Number of cells held by each phase, free space included.
    pub fn cell_counts(&self, state: &SimulationState) -> IndexMap<String, usize> {
        state.cell_counts()
    }
}

fn normalized(amounts: IndexMap<String, f64>) -> IndexMap<String, f64> {
    let total: f64 = amounts.values().sum();
    if total <= 0.0 {
        return amounts.into_keys().map(|p| (p, 0.0)).collect();
    }
    amounts.into_iter().map(|(p, v)| (p, v / total)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{GeneralState, SiteState, FREE_SPACE};
    use kiln_test_utils::fixtures::{nacl_li2o, staggered_melts};

    fn thirds(mult: f64) -> SimulationState {
        let mut sites = Vec::new();
        for phase in ["NaCl", "Li2O", "YMnO3"] {
            sites.extend(std::iter::repeat(SiteState::new(phase, 1.0)).take(9));
        }
        SimulationState::new(
            sites,
            GeneralState {
                vol_multiplier: mult,
                ..GeneralState::default()
            },
        )
    }

    fn assert_near(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn melted_fraction_steps_with_temperature() {
        let phases = staggered_melts();
        let an = StepAnalyzer::new(&phases);
        let state = thirds(1.0);
        assert_near(an.melted_fraction(&state, 500.0), 0.0);
        assert_near(an.melted_fraction(&state, 650.0), 1.0 / 3.0);
        assert_near(an.melted_fraction(&state, 750.0), 2.0 / 3.0);
        assert_near(an.melted_fraction(&state, 850.0), 1.0);
    }

    #[test]
    fn solid_ratio_counts_the_ledger() {
        let phases = staggered_melts();
        let an = StepAnalyzer::new(&phases);
        let mut state = thirds(1.0);
        assert_near(an.solid_ratio(&state, 500.0), 1.0);
        assert_near(an.solid_ratio(&state, 650.0), 2.0 / 3.0);
        assert_near(an.solid_ratio(&state, 750.0), 1.0 / 3.0);
        assert_near(an.solid_ratio(&state, 850.0), 0.0);

        state.general.melted_volumes.insert("NaCl".into(), 9.0);
        assert_near(an.solid_ratio(&state, 500.0), 4.0 / 3.0);
        assert_near(an.resolidified_fraction(&state, 500.0), 1.0 / 3.0);
        assert_near(an.resolidified_fraction(&state, 650.0), 0.0);
    }

    #[test]
    fn absolute_volumes_scale_with_multiplier() {
        let phases = staggered_melts();
        let an = StepAnalyzer::new(&phases);
        let state = thirds(0.5);
        assert_near(an.total_volume(&state), 27.0);
        assert_near(an.total_absolute_volume(&state, false), 13.5);
        assert_near(an.ideal_grid_volume(&state), 13.5);
        assert_eq!(an.simulation_side(&state), 3);
    }

    #[test]
    fn melted_and_solid_partition_everything() {
        let phases = staggered_melts();
        let an = StepAnalyzer::new(&phases);
        let mut state = thirds(1.0);
        state.general.melted_volumes.insert("Li2O".into(), 3.0);
        let melted = an.absolute_melted_volumes(&state, 750.0);
        let solid = an.absolute_solid_volumes(&state, 750.0);
        assert_near(melted["NaCl"], 9.0);
        assert_near(melted["Li2O"], 12.0);
        assert_near(solid["YMnO3"], 9.0);
        assert!(!solid.contains_key("NaCl"));
    }

    #[test]
    fn molar_and_elemental_breakdown() {
        let phases = nacl_li2o();
        let an = StepAnalyzer::new(&phases);
        // 2 cells of NaCl (2 mol) and 1 cell of Li2O (2 mol), one free.
        let state = SimulationState::new(
            vec![
                SiteState::new("NaCl", 1.0),
                SiteState::new("NaCl", 1.0),
                SiteState::new("Li2O", 1.0),
                SiteState::free(),
            ],
            GeneralState::default(),
        );
        let moles = an.molar_breakdown(&state, false).unwrap();
        assert_near(moles["NaCl"], 2.0);
        assert_near(moles["Li2O"], 2.0);
        assert!(!moles.contains_key(FREE_SPACE));

        let fractions = an.molar_fractions(&state, false).unwrap();
        assert_near(fractions["NaCl"], 0.5);

        let elements = an.elemental_composition(&state, false).unwrap();
        assert_near(elements["Na"], 2.0);
        assert_near(elements["Cl"], 2.0);
        assert_near(elements["Li"], 4.0);
        assert_near(elements["O"], 2.0);

        let el_fractions = an.elemental_fractions(&state, false).unwrap();
        assert_near(el_fractions.values().sum::<f64>(), 1.0);
        assert_eq!(an.cell_counts(&state)[FREE_SPACE], 1);
        assert_eq!(an.phases_present(&state), vec!["NaCl", "Li2O"]);
    }

    #[test]
    fn empty_grid_fractions_are_zero() {
        let phases = nacl_li2o();
        let an = StepAnalyzer::new(&phases);
        let state = SimulationState::all_free(8);
        assert!(an.volume_fractions(&state, true).is_empty());
        assert_near(an.melted_fraction(&state, 2000.0), 0.0);
    }
}
