//! Phase catalog: per-phase physical properties and unit conversions.
//!
//! Volumes are molar volumes (volume per formula unit). All conversions
//! between moles, volumes and element amounts go through this type.

use crate::composition::Composition;
use crate::error::CatalogError;
use indexmap::IndexMap;
use kiln_core::{PhaseVolumes, FREE_SPACE};
use serde::{Deserialize, Serialize};

/// Gas phases assumed when a catalog does not list its own.
pub const DEFAULT_GASES: &[&str] = &["O2", "CO2", "CO", "N2", "H2", "H2O", "NH3", "F2", "Cl2"];

/// State of matter of a phase at a temperature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatterPhase {
    /// Solid.
    Solid,
    /// Above its melting point.
    Liquid,
    /// Listed as a gas.
    Gas,
}

/// Physical properties of every phase in a chemical system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PhaseSetRecord", into = "PhaseSetRecord")]
pub struct PhaseSet {
    phases: Vec<String>,
    volumes: IndexMap<String, f64>,
    gas_phases: Vec<String>,
    densities: IndexMap<String, f64>,
    melting_points: IndexMap<String, f64>,
    experimentally_observed: IndexMap<String, bool>,
}

impl PhaseSet {
    /// Start building a phase set.
    pub fn builder() -> PhaseSetBuilder {
        PhaseSetBuilder::new()
    }

    /// Parse a phase set from its JSON record.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let record: PhaseSetRecord = serde_json::from_str(json)?;
        Self::try_from(record)
    }

    /// Serialize to a JSON record.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Phase names in catalog order. Free space is never listed.
    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    /// Number of phases.
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Whether the catalog has no phases.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Whether `phase` has catalog entries.
    pub fn contains(&self, phase: &str) -> bool {
        self.volumes.contains_key(phase)
    }

    /// Molar volume of `phase`.
    pub fn volume(&self, phase: &str) -> Result<f64, CatalogError> {
        self.volumes
            .get(phase)
            .copied()
            .ok_or_else(|| CatalogError::UnknownPhase {
                phase: phase.to_string(),
            })
    }

    /// Melting point in kelvin, if known. A phase without one never melts.
    pub fn melting_point(&self, phase: &str) -> Option<f64> {
        self.melting_points.get(phase).copied()
    }

    /// Density, if known.
    pub fn density(&self, phase: &str) -> Option<f64> {
        self.densities.get(phase).copied()
    }

    /// Gas phase names.
    pub fn gas_phases(&self) -> &[String] {
        &self.gas_phases
    }

    /// Whether `phase` is a gas.
    pub fn is_gas(&self, phase: &str) -> bool {
        self.gas_phases.iter().any(|g| g == phase)
    }

    /// Whether `phase` has never been observed experimentally.
    pub fn is_theoretical(&self, phase: &str) -> bool {
        !self
            .experimentally_observed
            .get(phase)
            .copied()
            .unwrap_or(false)
    }

    /// Phases not observed experimentally.
    pub fn theoretical_phases(&self) -> Vec<&str> {
        self.phases
            .iter()
            .filter(|p| self.is_theoretical(p))
            .map(String::as_str)
            .collect()
    }

    /// Phases observed experimentally.
    pub fn experimentally_observed_phases(&self) -> Vec<&str> {
        self.phases
            .iter()
            .filter(|p| !self.is_theoretical(p))
            .map(String::as_str)
            .collect()
    }

    /// Whether `phase` is liquid at `temperature` (strictly above its
    /// melting point).
    pub fn is_melted(&self, phase: &str, temperature: f64) -> bool {
        self.melting_point(phase)
            .is_some_and(|mp| temperature > mp)
    }

    /// Phases liquid at `temperature`.
    pub fn melted_phases(&self, temperature: f64) -> Vec<&str> {
        self.phases
            .iter()
            .filter(|p| self.is_melted(p, temperature))
            .map(String::as_str)
            .collect()
    }

    /// State of matter of `phase`; solid when no temperature is given.
    pub fn matter_phase(&self, phase: &str, temperature: Option<f64>) -> MatterPhase {
        if self.is_gas(phase) {
            return MatterPhase::Gas;
        }
        match temperature {
            Some(t) if self.is_melted(phase, t) => MatterPhase::Liquid,
            _ => MatterPhase::Solid,
        }
    }

    // ── Conversions ─────────────────────────────────────────────

    /// Volume occupied by `moles` of `phase`.
    pub fn moles_to_volume(&self, moles: f64, phase: &str) -> Result<f64, CatalogError> {
        Ok(moles * self.volume(phase)?)
    }

    /// Moles of `phase` in `volume`.
    pub fn volume_to_moles(&self, volume: f64, phase: &str) -> Result<f64, CatalogError> {
        Ok(volume / self.volume(phase)?)
    }

    /// Convert a phase-to-moles map into a phase-to-volume map.
    pub fn mole_amounts_to_volumes(
        &self,
        moles: &IndexMap<String, f64>,
    ) -> Result<PhaseVolumes, CatalogError> {
        moles
            .iter()
            .map(|(p, n)| self.moles_to_volume(*n, p).map(|v| (p.clone(), v)))
            .collect()
    }

    /// Convert a phase-to-volume map into a phase-to-moles map.
    pub fn volume_amounts_to_moles(
        &self,
        volumes: &PhaseVolumes,
    ) -> Result<IndexMap<String, f64>, CatalogError> {
        volumes
            .iter()
            .map(|(p, v)| self.volume_to_moles(*v, p).map(|n| (p.clone(), n)))
            .collect()
    }

    /// Moles of each element in a collection of phases given in moles.
    pub fn mole_amounts_to_element_amounts(
        &self,
        moles: &IndexMap<String, f64>,
    ) -> Result<IndexMap<String, f64>, CatalogError> {
        let mut out: IndexMap<String, f64> = IndexMap::new();
        for (phase, n) in moles {
            let comp = Composition::parse(phase)?;
            for (el, per_unit) in comp.amounts() {
                *out.entry(el.clone()).or_insert(0.0) += per_unit * n;
            }
        }
        Ok(out)
    }

    /// Element mole fractions of a collection of phases given in moles.
    pub fn mole_amounts_to_element_fractions(
        &self,
        moles: &IndexMap<String, f64>,
    ) -> Result<IndexMap<String, f64>, CatalogError> {
        let amounts = self.mole_amounts_to_element_amounts(moles)?;
        let total: f64 = amounts.values().sum();
        Ok(amounts
            .into_iter()
            .map(|(el, n)| (el, if total > 0.0 { n / total } else { 0.0 }))
            .collect())
    }

    /// Moles of each element in a collection of phases given in volume.
    pub fn volume_amounts_to_element_amounts(
        &self,
        volumes: &PhaseVolumes,
    ) -> Result<IndexMap<String, f64>, CatalogError> {
        self.mole_amounts_to_element_amounts(&self.volume_amounts_to_moles(volumes)?)
    }
}

/// Builder for [`PhaseSet`].
///
/// # Examples
///
/// ```
/// use kiln_catalog::PhaseSet;
///
/// let phases = PhaseSet::builder()
///     .phase("NaCl", 1.0)
///     .melting_point("NaCl", 800.0)
///     .phase("Li2O", 0.5)
///     .build()
///     .unwrap();
/// assert!(phases.is_melted("NaCl", 900.0));
/// assert!(!phases.is_melted("Li2O", 900.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct PhaseSetBuilder {
    volumes: IndexMap<String, f64>,
    gas_phases: Option<Vec<String>>,
    densities: IndexMap<String, f64>,
    melting_points: IndexMap<String, f64>,
    experimentally_observed: IndexMap<String, bool>,
}

impl PhaseSetBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a phase with its molar volume.
    pub fn phase(mut self, name: impl Into<String>, volume: f64) -> Self {
        self.volumes.insert(name.into(), volume);
        self
    }

    /// Set a melting point in kelvin.
    pub fn melting_point(mut self, name: impl Into<String>, kelvin: f64) -> Self {
        self.melting_points.insert(name.into(), kelvin);
        self
    }

    /// Set a density.
    pub fn density(mut self, name: impl Into<String>, density: f64) -> Self {
        self.densities.insert(name.into(), density);
        self
    }

    /// Mark a phase as experimentally observed (or not).
    pub fn observed(mut self, name: impl Into<String>, observed: bool) -> Self {
        self.experimentally_observed.insert(name.into(), observed);
        self
    }

    /// Replace the gas phase list (defaults to [`DEFAULT_GASES`]).
    pub fn gas_phases<I, S>(mut self, gases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gas_phases = Some(gases.into_iter().map(Into::into).collect());
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<PhaseSet, CatalogError> {
        for (phase, &volume) in &self.volumes {
            if phase == FREE_SPACE || !(volume.is_finite() && volume > 0.0) {
                return Err(CatalogError::InvalidVolume {
                    phase: phase.clone(),
                    volume,
                });
            }
        }
        let keyed = self
            .melting_points
            .keys()
            .chain(self.densities.keys())
            .chain(self.experimentally_observed.keys());
        for phase in keyed {
            if !self.volumes.contains_key(phase) {
                return Err(CatalogError::UnknownPhase {
                    phase: phase.clone(),
                });
            }
        }
        Ok(PhaseSet {
            phases: self.volumes.keys().cloned().collect(),
            volumes: self.volumes,
            gas_phases: self
                .gas_phases
                .unwrap_or_else(|| DEFAULT_GASES.iter().map(|g| g.to_string()).collect()),
            densities: self.densities,
            melting_points: self.melting_points,
            experimentally_observed: self.experimentally_observed,
        })
    }
}

// ── Serialized form ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PhaseSetRecord {
    phases: Vec<String>,
    volumes: IndexMap<String, f64>,
    #[serde(default = "default_gases")]
    gas_phases: Vec<String>,
    #[serde(default)]
    densities: IndexMap<String, f64>,
    #[serde(default)]
    melting_points: IndexMap<String, f64>,
    #[serde(default)]
    experimentally_observed: IndexMap<String, bool>,
}

fn default_gases() -> Vec<String> {
    DEFAULT_GASES.iter().map(|g| g.to_string()).collect()
}

impl TryFrom<PhaseSetRecord> for PhaseSet {
    type Error = CatalogError;

    fn try_from(r: PhaseSetRecord) -> Result<Self, Self::Error> {
        let mut builder = PhaseSet::builder().gas_phases(r.gas_phases);
        for phase in r.phases.into_iter().filter(|p| p != FREE_SPACE) {
            let volume = r.volumes.get(&phase).copied().unwrap_or(f64::NAN);
            builder = builder.phase(phase, volume);
        }
        builder.densities = r.densities;
        builder.melting_points = r.melting_points;
        builder.experimentally_observed = r.experimentally_observed;
        builder.build()
    }
}

impl From<PhaseSet> for PhaseSetRecord {
    fn from(p: PhaseSet) -> Self {
        Self {
            phases: p.phases,
            volumes: p.volumes,
            gas_phases: p.gas_phases,
            densities: p.densities,
            melting_points: p.melting_points,
            experimentally_observed: p.experimentally_observed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nacl_li2o() -> PhaseSet {
        PhaseSet::builder()
            .phase("NaCl", 1.0)
            .phase("Li2O", 0.5)
            .melting_point("NaCl", 800.0)
            .melting_point("Li2O", 1000.0)
            .observed("NaCl", true)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_bad_volumes() {
        let err = PhaseSet::builder().phase("A", 0.0).build().unwrap_err();
        assert!(matches!(err, CatalogError::InvalidVolume { .. }));
        let err = PhaseSet::builder().phase(FREE_SPACE, 1.0).build().unwrap_err();
        assert!(matches!(err, CatalogError::InvalidVolume { .. }));
        let err = PhaseSet::builder()
            .phase("A", 1.0)
            .melting_point("B", 10.0)
            .build()
            .unwrap_err();
        assert_eq!(err, CatalogError::UnknownPhase { phase: "B".into() });
    }

    #[test]
    fn melting_is_strict_and_optional() {
        let p = PhaseSet::builder()
            .phase("A", 1.0)
            .phase("B", 1.0)
            .melting_point("A", 800.0)
            .build()
            .unwrap();
        assert!(!p.is_melted("A", 800.0));
        assert!(p.is_melted("A", 800.1));
        assert!(!p.is_melted("B", 1e9));
        assert_eq!(p.melted_phases(900.0), vec!["A"]);
        assert_eq!(p.matter_phase("A", Some(900.0)), MatterPhase::Liquid);
        assert_eq!(p.matter_phase("A", None), MatterPhase::Solid);
        assert_eq!(p.matter_phase("CO2", Some(300.0)), MatterPhase::Gas);
    }

    #[test]
    fn equal_moles_give_two_to_one_volume() {
        let p = nacl_li2o();
        let moles = IndexMap::from([("NaCl".to_string(), 1.0), ("Li2O".to_string(), 1.0)]);
        let vols = p.mole_amounts_to_volumes(&moles).unwrap();
        assert_eq!(vols["NaCl"] / vols["Li2O"], 2.0);
        let els = p.mole_amounts_to_element_amounts(&moles).unwrap();
        assert_eq!(els["Na"], 1.0);
        assert_eq!(els["Cl"], 1.0);
        assert_eq!(els["Li"], 2.0);
        assert_eq!(els["O"], 1.0);
    }

    #[test]
    fn observed_flags() {
        let p = nacl_li2o();
        assert_eq!(p.theoretical_phases(), vec!["Li2O"]);
        assert_eq!(p.experimentally_observed_phases(), vec!["NaCl"]);
    }

    #[test]
    fn unknown_phase_volume_lookup_fails() {
        let p = nacl_li2o();
        assert_eq!(
            p.volume("KCl").unwrap_err(),
            CatalogError::UnknownPhase { phase: "KCl".into() }
        );
    }

    #[test]
    fn json_round_trip_and_defaults() {
        let p = nacl_li2o();
        let back = PhaseSet::from_json(&p.to_json().unwrap()).unwrap();
        assert_eq!(back, p);

        let minimal = r#"{"phases": ["BaO", "Free Space"], "volumes": {"BaO": 42.6}}"#;
        let p = PhaseSet::from_json(minimal).unwrap();
        assert_eq!(p.phases(), ["BaO".to_string()]);
        assert!(p.is_gas("O2"));

        let missing = r#"{"phases": ["BaO"], "volumes": {}}"#;
        assert!(matches!(
            PhaseSet::from_json(missing),
            Err(CatalogError::InvalidVolume { .. })
        ));
    }
}
