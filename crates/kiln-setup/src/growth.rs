//! Grain growth from nucleation seeds into free space.

use std::sync::Arc;

use kiln_controller::SiteController;
use kiln_core::{PhaseVolumes, SimError, SimulationState, SiteId, SiteState, StateDiff};
use kiln_space::NeighborGraph;
use rand::{Rng, RngCore};

/// Fills free cells from their occupied neighbours.
///
/// A visited free cell with at least one occupied neighbour takes the
/// neighbouring phase whose absolute volume is furthest below its target;
/// ties go to the phase with more neighbouring cells. Filled cells get
/// unit raw volume.
///
/// The controller keeps running totals of the free cells and per-phase
/// volumes, so it assumes every diff it returns is applied before the next
/// tick (the step scheduler guarantees this). Site selection stops once no
/// free cells remain.
pub struct GrowthController {
    graph: Arc<dyn NeighborGraph>,
    targets: PhaseVolumes,
    current: PhaseVolumes,
    vol_multiplier: f64,
    vacant: Vec<SiteId>,
    slot: Vec<Option<usize>>,
}

impl GrowthController {
    /// A controller growing `state` towards absolute `targets` over
    /// `graph`.
    pub fn new(graph: Arc<dyn NeighborGraph>, targets: PhaseVolumes, state: &SimulationState) -> Self {
        let vacant = state.free_sites();
        let mut slot = vec![None; state.site_count()];
        for (i, site) in vacant.iter().enumerate() {
            slot[site.index()] = Some(i);
        }
        Self {
            graph,
            targets,
            current: state.absolute_grid_volumes(),
            vol_multiplier: state.general.vol_multiplier,
            vacant,
            slot,
        }
    }

    /// Free cells not yet filled.
    pub fn vacant_count(&self) -> usize {
        self.vacant.len()
    }

    fn forget(&mut self, site: SiteId) {
        let Some(i) = self.slot.get_mut(site.index()).and_then(Option::take) else {
            return;
        };
        self.vacant.swap_remove(i);
        if let Some(moved) = self.vacant.get(i) {
            self.slot[moved.index()] = Some(i);
        }
    }

    fn deficit(&self, phase: &str) -> f64 {
        let current = self.current.get(phase).copied().unwrap_or(0.0);
        let target = self.targets.get(phase).copied().unwrap_or(0.0);
        current - target
    }
}

impl SiteController for GrowthController {
    fn name(&self) -> &str {
        "GrowthController"
    }

    fn select_site(&mut self, _state: &SimulationState, rng: &mut dyn RngCore) -> Option<SiteId> {
        if self.vacant.is_empty() {
            return None;
        }
        Some(self.vacant[rng.gen_range(0..self.vacant.len())])
    }

    fn propose_update(
        &mut self,
        site: SiteId,
        state: &SimulationState,
        _rng: &mut dyn RngCore,
    ) -> Result<StateDiff, SimError> {
        let mut diff = StateDiff::empty();
        if !state.try_site(site)?.is_free() {
            self.forget(site);
            return Ok(diff);
        }

        let mut tally: Vec<(&str, usize)> = Vec::new();
        for &(nb, _) in self.graph.neighbors(site) {
            let other = state.try_site(nb)?;
            if other.is_free() {
                continue;
            }
            match tally.iter_mut().find(|(p, _)| *p == other.phase) {
                Some((_, n)) => *n += 1,
                None => tally.push((other.phase.as_str(), 1)),
            }
        }

        let chosen = tally
            .iter()
            .min_by(|(pa, na), (pb, nb)| {
                self.deficit(pa)
                    .total_cmp(&self.deficit(pb))
                    .then_with(|| nb.cmp(na))
            })
            .map(|(p, _)| p.to_string());

        if let Some(phase) = chosen {
            *self.current.entry(phase.clone()).or_insert(0.0) += self.vol_multiplier;
            diff.set_site(site, SiteState::new(phase, 1.0));
            self.forget(site);
        }
        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_controller::StepRunner;
    use kiln_test_utils::{grid_of, MockGraph};

    fn targets(pairs: &[(&str, f64)]) -> PhaseVolumes {
        pairs.iter().map(|(p, v)| (p.to_string(), *v)).collect()
    }

    #[test]
    fn fills_from_occupied_neighbours_only() {
        // 0 - 1 - 2, only site 0 occupied; site 2 cannot fill until 1 does.
        let graph = Arc::new(MockGraph::new(3).connect(0, 1, 1.0).connect(1, 2, 1.0));
        let state = grid_of(&[("A", 1.0), (kiln_core::FREE_SPACE, 1.0), (kiln_core::FREE_SPACE, 1.0)]);
        let mut growth = GrowthController::new(graph, targets(&[("A", 3.0)]), &state);
        let mut rng = rand::rngs::mock::StepRng::new(0, 0);

        let diff = growth.propose_update(SiteId(2), &state, &mut rng).unwrap();
        assert!(diff.is_empty());
        assert_eq!(growth.vacant_count(), 2);

        let diff = growth.propose_update(SiteId(1), &state, &mut rng).unwrap();
        assert_eq!(diff.sites[&SiteId(1)], SiteState::new("A", 1.0));
        assert_eq!(growth.vacant_count(), 1);
    }

    #[test]
    fn most_deficient_neighbour_phase_wins() {
        // Site 1 touches A (site 0) and B (site 2); B is further below target.
        let graph = Arc::new(MockGraph::new(3).connect(0, 1, 1.0).connect(1, 2, 1.0));
        let state = grid_of(&[("A", 1.0), (kiln_core::FREE_SPACE, 1.0), ("B", 1.0)]);
        let mut growth = GrowthController::new(graph, targets(&[("A", 1.0), ("B", 5.0)]), &state);
        let mut rng = rand::rngs::mock::StepRng::new(0, 0);
        let diff = growth.propose_update(SiteId(1), &state, &mut rng).unwrap();
        assert_eq!(diff.sites[&SiteId(1)].phase, "B");
    }

    #[test]
    fn ties_go_to_the_more_common_neighbour() {
        let graph = Arc::new(
            MockGraph::new(4)
                .connect(0, 1, 1.0)
                .connect(2, 1, 1.0)
                .connect(3, 1, 1.0),
        );
        let state = grid_of(&[("A", 1.0), (kiln_core::FREE_SPACE, 1.0), ("B", 1.0), ("B", 1.0)]);
        let mut growth = GrowthController::new(graph, targets(&[("A", 3.0), ("B", 4.0)]), &state);
        let mut rng = rand::rngs::mock::StepRng::new(0, 0);
        let diff = growth.propose_update(SiteId(1), &state, &mut rng).unwrap();
        assert_eq!(diff.sites[&SiteId(1)].phase, "B");
    }

    #[test]
    fn ring_fills_completely_and_stops() {
        let graph = Arc::new(MockGraph::ring(12));
        let mut sites = vec![(kiln_core::FREE_SPACE, 1.0); 12];
        sites[0] = ("A", 1.0);
        sites[6] = ("B", 1.0);
        let mut state = grid_of(&sites);
        let mut growth = GrowthController::new(graph, targets(&[("A", 6.0), ("B", 6.0)]), &state);
        let mut runner = StepRunner::new(5);
        runner.run_in_place(&mut growth, &mut state, 10_000).unwrap();
        assert_eq!(growth.vacant_count(), 0);
        assert!(state.free_sites().is_empty());
        assert!(runner.tick().0 < 10_000);
    }
}
