//! Scored reactions with volume-based stoichiometry.

use crate::error::CatalogError;
use crate::phase::DEFAULT_GASES;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable reaction between phases.
///
/// Stoichiometric coefficients are expressed as volumes, so the ratio of
/// product to reactant sums is the factor by which a consumed cell's
/// volume is rescaled. Gas phases are excluded from the "solid" sums.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReactionRecord", into = "ReactionRecord")]
pub struct Reaction {
    reactants: IndexMap<String, f64>,
    products: IndexMap<String, f64>,
    competitiveness: f64,
    energy_per_atom: Option<f64>,
    is_identity: bool,
    total_reactant: f64,
    total_product: f64,
    solid_reactant: f64,
    solid_product: f64,
}

impl Reaction {
    /// Build a reaction, classifying gases with [`DEFAULT_GASES`].
    ///
    /// Every coefficient must be finite and positive, both sides must be
    /// non-empty, and the competitiveness must be finite and non-negative.
    pub fn new(
        reactants: IndexMap<String, f64>,
        products: IndexMap<String, f64>,
        competitiveness: f64,
    ) -> Result<Self, CatalogError> {
        let mut rxn = Self {
            is_identity: false,
            total_reactant: reactants.values().sum(),
            total_product: products.values().sum(),
            solid_reactant: 0.0,
            solid_product: 0.0,
            reactants,
            products,
            competitiveness,
            energy_per_atom: None,
        };
        rxn.is_identity = rxn.reactants.len() == rxn.products.len()
            && rxn.reactants.keys().all(|p| rxn.products.contains_key(p));

        let reason = if rxn.reactants.is_empty() || rxn.products.is_empty() {
            Some("both sides must be non-empty")
        } else if rxn
            .reactants
            .values()
            .chain(rxn.products.values())
            .any(|c| !(c.is_finite() && *c > 0.0))
        {
            Some("stoichiometric coefficients must be positive")
        } else if !(competitiveness.is_finite() && competitiveness >= 0.0) {
            Some("competitiveness must be finite and non-negative")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(rxn.invalid(reason));
        }
        let gases: Vec<String> = DEFAULT_GASES.iter().map(|g| g.to_string()).collect();
        rxn.classify_gases(&gases)?;
        Ok(rxn)
    }

    /// Parse a stoichiometry given as `(phase, coefficient)` pairs.
    pub fn from_pairs(
        reactants: &[(&str, f64)],
        products: &[(&str, f64)],
        competitiveness: f64,
    ) -> Result<Self, CatalogError> {
        let to_map = |side: &[(&str, f64)]| {
            side.iter()
                .map(|(p, c)| (p.to_string(), *c))
                .collect::<IndexMap<_, _>>()
        };
        Self::new(to_map(reactants), to_map(products), competitiveness)
    }

    /// The no-op reaction `1 phase -> 1 phase`.
    pub fn identity(phase: &str, strength: f64) -> Result<Self, CatalogError> {
        Self::from_pairs(&[(phase, 1.0)], &[(phase, 1.0)], strength)
    }

    /// Attach the reaction energy reported by the scoring service.
    pub fn with_energy_per_atom(mut self, energy: f64) -> Self {
        self.energy_per_atom = Some(energy);
        self
    }

    /// Recompute the solid sums against a catalog's gas list.
    pub(crate) fn classify_gases(&mut self, gases: &[String]) -> Result<(), CatalogError> {
        let is_gas = |p: &String| gases.iter().any(|g| g == p);
        self.solid_reactant = self
            .reactants
            .iter()
            .filter(|(p, _)| !is_gas(p))
            .map(|(_, c)| c)
            .sum();
        self.solid_product = self
            .products
            .iter()
            .filter(|(p, _)| !is_gas(p))
            .map(|(_, c)| c)
            .sum();
        if self.solid_reactant <= 0.0 {
            return Err(self.invalid("at least one reactant must be a solid"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> CatalogError {
        CatalogError::InvalidReaction {
            reaction: self.to_string(),
            reason: reason.to_string(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Reactant coefficients.
    pub fn reactants(&self) -> &IndexMap<String, f64> {
        &self.reactants
    }

    /// Product coefficients.
    pub fn products(&self) -> &IndexMap<String, f64> {
        &self.products
    }

    /// Competitiveness score.
    pub fn competitiveness(&self) -> f64 {
        self.competitiveness
    }

    /// Reaction energy per atom, if supplied.
    pub fn energy_per_atom(&self) -> Option<f64> {
        self.energy_per_atom
    }

    /// Whether the reactant set equals the product set.
    pub fn is_identity(&self) -> bool {
        self.is_identity
    }

    /// Sorted, deduplicated reactant phase names.
    pub fn reactant_key(&self) -> Vec<String> {
        let mut key: Vec<String> = self.reactants.keys().cloned().collect();
        key.sort();
        key
    }

    /// Whether `phases` is exactly this reaction's reactant set.
    pub fn can_proceed_with(&self, phases: &[&str]) -> bool {
        phases.iter().all(|p| self.reactants.contains_key(*p))
            && self.reactants.keys().all(|r| phases.contains(&r.as_str()))
    }

    /// Whether any of `phases` is a reactant.
    pub fn any_reactants(&self, phases: &[&str]) -> bool {
        phases.iter().any(|p| self.reactants.contains_key(*p))
    }

    /// Sum of reactant coefficients.
    pub fn total_reactant_stoich(&self) -> f64 {
        self.total_reactant
    }

    /// Sum of product coefficients.
    pub fn total_product_stoich(&self) -> f64 {
        self.total_product
    }

    /// Sum of non-gas reactant coefficients.
    pub fn total_solid_reactant_stoich(&self) -> f64 {
        self.solid_reactant
    }

    /// Sum of non-gas product coefficients.
    pub fn total_solid_product_stoich(&self) -> f64 {
        self.solid_product
    }

    /// Sum of gas reactant coefficients.
    pub fn total_gas_reactant_stoich(&self) -> f64 {
        self.total_reactant - self.solid_reactant
    }

    /// Product sum over reactant sum.
    pub fn product_reactant_ratio(&self) -> f64 {
        self.total_product / self.total_reactant
    }

    /// Solid product sum over solid reactant sum.
    pub fn solid_product_reactant_ratio(&self) -> f64 {
        self.solid_product / self.solid_reactant
    }

    /// Coefficient of a reactant.
    pub fn reactant_stoich(&self, phase: &str) -> Option<f64> {
        self.reactants.get(phase).copied()
    }

    /// Coefficient of a product.
    pub fn product_stoich(&self, phase: &str) -> Option<f64> {
        self.products.get(phase).copied()
    }

    /// Reactant coefficient over the reactant sum; zero if absent.
    pub fn reactant_stoich_fraction(&self, phase: &str) -> f64 {
        self.reactant_stoich(phase).unwrap_or(0.0) / self.total_reactant
    }

    /// Reactant coefficient over the solid reactant sum; zero if absent.
    pub fn solid_reactant_stoich_fraction(&self, phase: &str) -> f64 {
        self.reactant_stoich(phase).unwrap_or(0.0) / self.solid_reactant
    }

    /// Product coefficient over the product sum; zero if absent.
    pub fn product_stoich_fraction(&self, phase: &str) -> f64 {
        self.product_stoich(phase).unwrap_or(0.0) / self.total_product
    }

    /// Ratio of the coefficients of two phases appearing anywhere in the
    /// reaction.
    pub fn stoich_ratio(&self, numerator: &str, denominator: &str) -> Option<f64> {
        let coeff = |p: &str| self.product_stoich(p).or_else(|| self.reactant_stoich(p));
        Some(coeff(numerator)? / coeff(denominator)?)
    }

    /// Every phase on either side.
    pub fn all_phases(&self) -> impl Iterator<Item = &str> {
        self.reactants
            .keys()
            .chain(self.products.keys().filter(|p| !self.reactants.contains_key(*p)))
            .map(String::as_str)
    }
}

fn write_side(f: &mut fmt::Formatter<'_>, side: &IndexMap<String, f64>) -> fmt::Result {
    for (i, (phase, coeff)) in side.iter().enumerate() {
        if i > 0 {
            write!(f, "+")?;
        }
        write!(f, "{coeff}{phase}")?;
    }
    Ok(())
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_side(f, &self.reactants)?;
        write!(f, "->")?;
        write_side(f, &self.products)
    }
}

// ── Serialized form ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ReactionRecord {
    reactants: IndexMap<String, f64>,
    products: IndexMap<String, f64>,
    competitiveness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    energy_per_atom: Option<f64>,
}

impl TryFrom<ReactionRecord> for Reaction {
    type Error = CatalogError;

    fn try_from(r: ReactionRecord) -> Result<Self, Self::Error> {
        let rxn = Reaction::new(r.reactants, r.products, r.competitiveness)?;
        Ok(match r.energy_per_atom {
            Some(e) => rxn.with_energy_per_atom(e),
            None => rxn,
        })
    }
}

impl From<Reaction> for ReactionRecord {
    fn from(r: Reaction) -> Self {
        Self {
            reactants: r.reactants,
            products: r.products,
            competitiveness: r.competitiveness,
            energy_per_atom: r.energy_per_atom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_sums_exclude_gases() {
        let r = Reaction::from_pairs(&[("BaCO3", 2.0), ("TiO2", 1.0)], &[("BaTiO3", 2.0), ("CO2", 1.0)], 3.0)
            .unwrap();
        assert_eq!(r.total_reactant_stoich(), 3.0);
        assert_eq!(r.total_product_stoich(), 3.0);
        assert_eq!(r.total_solid_product_stoich(), 2.0);
        assert_eq!(r.total_solid_reactant_stoich(), 3.0);
        assert_eq!(r.product_reactant_ratio(), 1.0);
        assert!((r.solid_product_reactant_ratio() - 2.0 / 3.0).abs() < 1e-12);
        assert!((r.solid_reactant_stoich_fraction("BaCO3") - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(r.product_stoich_fraction("CO2"), 1.0 / 3.0);
        assert_eq!(r.reactant_stoich_fraction("ZnO"), 0.0);
        assert_eq!(r.stoich_ratio("BaTiO3", "TiO2"), Some(2.0));
    }

    #[test]
    fn gas_reactants_are_tracked() {
        let r = Reaction::from_pairs(&[("Mn3O4", 2.0), ("O2", 1.0)], &[("Mn2O3", 3.0)], 1.0).unwrap();
        assert_eq!(r.total_gas_reactant_stoich(), 1.0);
        assert_eq!(r.solid_reactant_stoich_fraction("Mn3O4"), 1.0);
    }

    #[test]
    fn identity_detection() {
        let id = Reaction::identity("BaO", 0.1).unwrap();
        assert!(id.is_identity());
        assert_eq!(id.to_string(), "1BaO->1BaO");
        let r = Reaction::from_pairs(&[("BaO", 1.0)], &[("BaO2", 1.0)], 0.1).unwrap();
        assert!(!r.is_identity());
    }

    #[test]
    fn rejects_malformed() {
        assert!(Reaction::from_pairs(&[], &[("A", 1.0)], 1.0).is_err());
        assert!(Reaction::from_pairs(&[("A", -1.0)], &[("B", 1.0)], 1.0).is_err());
        assert!(Reaction::from_pairs(&[("A", 1.0)], &[("B", 1.0)], f64::NAN).is_err());
        assert!(Reaction::from_pairs(&[("O2", 1.0)], &[("O3", 1.0)], 1.0).is_err());
    }

    #[test]
    fn exact_reactant_matching() {
        let r = Reaction::from_pairs(&[("A", 1.0), ("B", 1.0)], &[("AB", 2.0)], 1.0).unwrap();
        assert!(r.can_proceed_with(&["B", "A"]));
        assert!(!r.can_proceed_with(&["A"]));
        assert!(!r.can_proceed_with(&["A", "B", "C"]));
        assert!(r.any_reactants(&["C", "A"]));
        assert_eq!(r.reactant_key(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(r.all_phases().collect::<Vec<_>>(), vec!["A", "B", "AB"]);
    }

    #[test]
    fn json_round_trip() {
        let r = Reaction::from_pairs(&[("BaO", 42.6), ("TiO2", 31.2)], &[("BaTiO3", 64.4)], 2.5)
            .unwrap()
            .with_energy_per_atom(-0.12);
        let json = serde_json::to_string(&r).unwrap();
        let back: Reaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
