//! Temperature-indexed collection of reaction sets.

use crate::error::CatalogError;
use crate::phase::PhaseSet;
use crate::reaction::Reaction;
use crate::reaction_set::ReactionSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Temperatures closer than this are treated as the same entry.
const TEMPERATURE_TOLERANCE: f64 = 1e-6;

/// Reaction sets pre-scored at each temperature of a heating schedule.
///
/// All sets share one phase catalog.
#[derive(Clone, Debug)]
pub struct ReactionLibrary {
    phases: Arc<PhaseSet>,
    sets: Vec<(f64, Arc<ReactionSet>)>,
}

impl ReactionLibrary {
    /// An empty library over `phases`.
    pub fn new(phases: Arc<PhaseSet>) -> Self {
        Self {
            phases,
            sets: Vec::new(),
        }
    }

    /// The shared phase catalog.
    pub fn phases(&self) -> &Arc<PhaseSet> {
        &self.phases
    }

    /// Build and store the set for `temperature`, replacing any existing
    /// entry at that temperature.
    pub fn add_reactions_at(
        &mut self,
        temperature: f64,
        reactions: Vec<Reaction>,
    ) -> Result<(), CatalogError> {
        let set = ReactionSet::new(reactions, Arc::clone(&self.phases))?;
        self.insert(temperature, Arc::new(set));
        Ok(())
    }

    fn insert(&mut self, temperature: f64, set: Arc<ReactionSet>) {
        match self.position(temperature) {
            Some(i) => self.sets[i].1 = set,
            None => {
                self.sets.push((temperature, set));
                self.sets.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
        }
    }

    fn position(&self, temperature: f64) -> Option<usize> {
        self.sets
            .iter()
            .position(|(t, _)| (t - temperature).abs() <= TEMPERATURE_TOLERANCE)
    }

    /// The set scored at `temperature`.
    pub fn get(&self, temperature: f64) -> Result<&Arc<ReactionSet>, CatalogError> {
        self.position(temperature)
            .map(|i| &self.sets[i].1)
            .ok_or(CatalogError::MissingTemperature { temperature })
    }

    /// Stored temperatures in ascending order.
    pub fn temperatures(&self) -> Vec<f64> {
        self.sets.iter().map(|(t, _)| *t).collect()
    }

    /// Number of stored temperatures.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no temperature is stored.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Parse a library from JSON of the form
    /// `{"phases": {...}, "sets": [{"temperature": t, "reactions": [...]}]}`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let record: LibraryRecord = serde_json::from_str(json)?;
        let mut lib = Self::new(Arc::new(record.phases));
        for entry in record.sets {
            lib.add_reactions_at(entry.temperature, entry.reactions)?;
        }
        Ok(lib)
    }

    /// Serialize to the JSON form accepted by [`ReactionLibrary::from_json`].
    ///
    /// Synthesized identity reactions are written out explicitly.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let record = LibraryRecord {
            phases: (*self.phases).clone(),
            sets: self
                .sets
                .iter()
                .map(|(t, set)| LibraryEntry {
                    temperature: *t,
                    reactions: set.reactions().cloned().collect(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&record)?)
    }
}

#[derive(Serialize, Deserialize)]
struct LibraryRecord {
    phases: PhaseSet,
    sets: Vec<LibraryEntry>,
}

#[derive(Serialize, Deserialize)]
struct LibraryEntry {
    temperature: f64,
    reactions: Vec<Reaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ReactionLibrary {
        let phases = Arc::new(
            PhaseSet::builder()
                .phase("A", 1.0)
                .phase("B", 1.0)
                .phase("AB", 2.0)
                .build()
                .unwrap(),
        );
        let mut lib = ReactionLibrary::new(phases);
        let rxn = |score| {
            Reaction::from_pairs(&[("A", 1.0), ("B", 1.0)], &[("AB", 2.0)], score).unwrap()
        };
        lib.add_reactions_at(1200.0, vec![rxn(3.0)]).unwrap();
        lib.add_reactions_at(800.0, vec![rxn(1.0)]).unwrap();
        lib
    }

    #[test]
    fn lookup_by_temperature() {
        let lib = library();
        assert_eq!(lib.temperatures(), vec![800.0, 1200.0]);
        let hot = lib.get(1200.0).unwrap();
        assert_eq!(hot.get_reactions(&["A", "B"])[0].competitiveness(), 3.0);
        assert!(Arc::ptr_eq(hot.phases(), lib.phases()));
    }

    #[test]
    fn missing_temperature_is_an_error() {
        assert_eq!(
            library().get(1000.0).unwrap_err(),
            CatalogError::MissingTemperature { temperature: 1000.0 }
        );
    }

    #[test]
    fn re_adding_replaces() {
        let mut lib = library();
        lib.add_reactions_at(800.0, vec![]).unwrap();
        assert_eq!(lib.len(), 2);
        assert!(lib.get(800.0).unwrap().get_reactions(&["A", "B"]).is_empty());
    }

    #[test]
    fn json_round_trip() {
        let lib = library();
        let back = ReactionLibrary::from_json(&lib.to_json().unwrap()).unwrap();
        assert_eq!(back.temperatures(), lib.temperatures());
        assert_eq!(back.get(800.0).unwrap().len(), lib.get(800.0).unwrap().len());
    }
}
