//! Cell-by-cell random scattering of phases.

use indexmap::IndexMap;
use kiln_catalog::PhaseSet;
use kiln_core::{GeneralState, SimError, SimulationState, SiteState};
use rand::seq::SliceRandom;
use rand::RngCore;

/// Share of cells occupied by [`random_noise`] unless told otherwise.
pub const DEFAULT_PACKING_EFFICIENCY: f64 = 0.97;

/// Scatter phases over a `side`³ grid of unit-volume cells.
///
/// Each phase gets `round(fraction * side³ * packing_efficiency)` cells,
/// where `fraction` is its share of the total volume implied by
/// `mole_ratios`. The remaining cells stay free. No growth or tuning is
/// performed, so composition matches only to whole cells.
///
/// # Errors
///
/// [`SimError::UnknownPhase`] for phases missing from the catalog and
/// [`SimError::Setup`] for a packing efficiency outside `(0, 1]` or a
/// composition without material.
pub fn random_noise(
    phases: &PhaseSet,
    mole_ratios: &IndexMap<String, f64>,
    side: u32,
    packing_efficiency: f64,
    rng: &mut dyn RngCore,
) -> Result<SimulationState, SimError> {
    if !(packing_efficiency > 0.0 && packing_efficiency <= 1.0) {
        return Err(SimError::Setup {
            reason: format!("packing efficiency must be in (0, 1], got {packing_efficiency}"),
        });
    }
    let volumes = phases.mole_amounts_to_volumes(mole_ratios)?;
    let total: f64 = volumes.values().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(SimError::Setup {
            reason: "composition has no material".to_string(),
        });
    }

    let n = (side as usize).pow(3);
    let filled = n as f64 * packing_efficiency;
    let mut occupants: Vec<&str> = Vec::new();
    for (phase, v) in &volumes {
        let count = (v / total * filled).round() as usize;
        occupants.extend(std::iter::repeat(phase.as_str()).take(count));
    }
    occupants.truncate(n);

    let mut sites = vec![SiteState::free(); n];
    for (site, phase) in sites.iter_mut().zip(occupants) {
        *site = SiteState::new(phase, 1.0);
    }
    sites.shuffle(rng);
    Ok(SimulationState::new(sites, GeneralState::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::FREE_SPACE;
    use kiln_test_utils::fixtures::nacl_li2o;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ratios(pairs: &[(&str, f64)]) -> IndexMap<String, f64> {
        pairs.iter().map(|(p, v)| (p.to_string(), *v)).collect()
    }

    #[test]
    fn leaves_a_packing_gap() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let state = random_noise(
            &nacl_li2o(),
            &ratios(&[("NaCl", 1.0), ("Li2O", 1.0)]),
            10,
            DEFAULT_PACKING_EFFICIENCY,
            &mut rng,
        )
        .unwrap();
        let counts = state.cell_counts();
        // 970 cells split 2:1 by volume.
        assert_eq!(counts["NaCl"], 647);
        assert_eq!(counts["Li2O"], 323);
        assert_eq!(counts[FREE_SPACE], 30);
        assert!(state.sites.iter().all(|s| s.volume == 1.0));
    }

    #[test]
    fn rejects_bad_packing() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let goal = ratios(&[("NaCl", 1.0)]);
        assert!(random_noise(&nacl_li2o(), &goal, 3, 0.0, &mut rng).is_err());
        assert!(random_noise(&nacl_li2o(), &goal, 3, 1.5, &mut rng).is_err());
    }
}
