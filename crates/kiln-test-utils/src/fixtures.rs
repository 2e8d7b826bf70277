//! Fixture chemical systems.
//!
//! - [`nacl_li2o`]: two phases with a 2:1 molar volume ratio.
//! - [`staggered_melts`]: three unit-volume phases melting at 600/700/800 K.
//! - [`ba_ti_o_library`]: the Ba-Ti-O system scored at 1200 K, with BaO and
//!   TiO2 precursors and four ternary products.
//! - [`balanced_ab`]: a volume-balanced A/B system with a gas-releasing
//!   branch and an oxygen uptake reaction, for conservation tests.

use std::sync::Arc;

use kiln_catalog::{PhaseSet, Reaction, ReactionLibrary, ReactionSet};

/// NaCl (volume 1.0, melts at 800 K) and Li2O (volume 0.5, melts at 1000 K).
pub fn nacl_li2o() -> Arc<PhaseSet> {
    Arc::new(
        PhaseSet::builder()
            .phase("NaCl", 1.0)
            .phase("Li2O", 0.5)
            .melting_point("NaCl", 800.0)
            .melting_point("Li2O", 1000.0)
            .build()
            .expect("fixture phases are valid"),
    )
}

/// NaCl, Li2O and YMnO3, all of unit volume, melting at 600, 700 and 800 K.
pub fn staggered_melts() -> Arc<PhaseSet> {
    Arc::new(
        PhaseSet::builder()
            .phase("NaCl", 1.0)
            .phase("Li2O", 1.0)
            .phase("YMnO3", 1.0)
            .melting_point("NaCl", 600.0)
            .melting_point("Li2O", 700.0)
            .melting_point("YMnO3", 800.0)
            .build()
            .expect("fixture phases are valid"),
    )
}

/// Temperature at which [`ba_ti_o_library`] is scored.
pub const BA_TI_O_TEMPERATURE: f64 = 1200.0;

/// Products expected from a BaO/TiO2 precursor mixture at 1200 K.
pub const BA_TI_O_PRODUCTS: [&str; 4] = ["BaTiO3", "Ba2TiO4", "BaTi2O5", "Ba4Ti13O30"];

/// Molar volumes in cubic angstroms per formula unit.
pub fn ba_ti_o_phases() -> Arc<PhaseSet> {
    Arc::new(
        PhaseSet::builder()
            .phase("BaO", 42.6)
            .phase("TiO2", 31.2)
            .phase("BaTiO3", 64.4)
            .phase("Ba2TiO4", 109.0)
            .phase("BaTi2O5", 97.0)
            .phase("Ba4Ti13O30", 460.0)
            .melting_point("BaO", 2196.0)
            .melting_point("TiO2", 2116.0)
            .melting_point("BaTiO3", 1898.0)
            .melting_point("Ba2TiO4", 2133.0)
            .melting_point("BaTi2O5", 1593.0)
            .melting_point("Ba4Ti13O30", 1630.0)
            .observed("BaO", true)
            .observed("TiO2", true)
            .observed("BaTiO3", true)
            .observed("Ba2TiO4", true)
            .observed("BaTi2O5", true)
            .observed("Ba4Ti13O30", true)
            .build()
            .expect("fixture phases are valid"),
    )
}

fn rxn(reactants: &[(&str, f64)], products: &[(&str, f64)], score: f64) -> Reaction {
    Reaction::from_pairs(reactants, products, score).expect("fixture reaction is valid")
}

/// Scored Ba-Ti-O reactions with volume stoichiometry (moles times
/// molar volume).
pub fn ba_ti_o_reactions() -> Vec<Reaction> {
    vec![
        rxn(&[("BaO", 42.6), ("TiO2", 31.2)], &[("BaTiO3", 64.4)], 3.0),
        rxn(&[("BaO", 85.2), ("TiO2", 31.2)], &[("Ba2TiO4", 109.0)], 1.2),
        rxn(&[("BaO", 42.6), ("TiO2", 62.4)], &[("BaTi2O5", 97.0)], 1.2),
        rxn(&[("BaO", 170.4), ("TiO2", 405.6)], &[("Ba4Ti13O30", 460.0)], 1.0),
        rxn(&[("BaTiO3", 64.4), ("BaO", 42.6)], &[("Ba2TiO4", 109.0)], 0.3),
        rxn(&[("BaTiO3", 64.4), ("TiO2", 31.2)], &[("BaTi2O5", 97.0)], 0.3),
    ]
}

/// The Ba-Ti-O library with one entry at [`BA_TI_O_TEMPERATURE`].
pub fn ba_ti_o_library() -> ReactionLibrary {
    let mut lib = ReactionLibrary::new(ba_ti_o_phases());
    lib.add_reactions_at(BA_TI_O_TEMPERATURE, ba_ti_o_reactions())
        .expect("fixture reactions are valid");
    lib
}

/// Phases A, B (unit volume) and AB (volume 2), plus C formed from A and
/// atmospheric oxygen.
pub fn balanced_ab_phases() -> Arc<PhaseSet> {
    Arc::new(
        PhaseSet::builder()
            .phase("A", 1.0)
            .phase("B", 1.0)
            .phase("AB", 2.0)
            .phase("C", 2.0)
            .melting_point("A", 900.0)
            .build()
            .expect("fixture phases are valid"),
    )
}

/// Volume-balanced reactions over [`balanced_ab_phases`]:
/// `A + B -> AB`, `A + B -> AB + CO2` and `A + O2 -> C`.
pub fn balanced_ab_reactions() -> Vec<Reaction> {
    vec![
        rxn(&[("A", 1.0), ("B", 1.0)], &[("AB", 2.0)], 2.0),
        rxn(&[("A", 1.0), ("B", 1.0)], &[("AB", 1.0), ("CO2", 1.0)], 1.0),
        rxn(&[("A", 1.0), ("O2", 1.0)], &[("C", 2.0)], 0.5),
    ]
}

/// [`balanced_ab_reactions`] as a set.
pub fn balanced_ab() -> Arc<ReactionSet> {
    Arc::new(
        ReactionSet::new(balanced_ab_reactions(), balanced_ab_phases())
            .expect("fixture reactions are valid"),
    )
}

/// The balanced A-B reactions stored at every temperature in `temperatures`.
pub fn balanced_ab_library(temperatures: &[f64]) -> ReactionLibrary {
    let mut lib = ReactionLibrary::new(balanced_ab_phases());
    for &t in temperatures {
        lib.add_reactions_at(t, balanced_ab_reactions())
            .expect("fixture reactions are valid");
    }
    lib
}
