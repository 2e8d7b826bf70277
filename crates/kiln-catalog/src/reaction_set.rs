//! Reactions available at one temperature, grouped by reactant set.

use crate::error::CatalogError;
use crate::phase::PhaseSet;
use crate::reaction::Reaction;
use indexmap::{Equivalent, IndexMap};
use kiln_core::FREE_SPACE;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Competitiveness given to synthesized identity reactions.
pub const IDENTITY_STRENGTH: f64 = 0.1;

/// Borrowed lookup key that hashes like the owned `Vec<String>` key.
struct ReactantKey<'a>(&'a [&'a str]);

impl Hash for ReactantKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Equivalent<Vec<String>> for ReactantKey<'_> {
    fn equivalent(&self, key: &Vec<String>) -> bool {
        key.len() == self.0.len() && key.iter().zip(self.0).all(|(a, b)| a == b)
    }
}

/// Reactions scored at one temperature for one chemical system.
///
/// Reactions are grouped by their exact reactant set; each group is
/// ordered by descending competitiveness. Construction adds the identity
/// reaction `1 p -> 1 p` for every catalog phase that lacks one, so every
/// phase of the catalog always has a fallback.
#[derive(Clone, Debug)]
pub struct ReactionSet {
    phases: Arc<PhaseSet>,
    groups: IndexMap<Vec<String>, Vec<Reaction>>,
}

impl ReactionSet {
    /// Build a set from scored reactions.
    ///
    /// Every phase named by a reaction must be a catalog phase or a gas.
    pub fn new(reactions: Vec<Reaction>, phases: Arc<PhaseSet>) -> Result<Self, CatalogError> {
        let mut set = Self {
            phases,
            groups: IndexMap::new(),
        };
        for mut rxn in reactions {
            for phase in rxn.all_phases() {
                if !set.phases.contains(phase) && !set.phases.is_gas(phase) && phase != FREE_SPACE {
                    return Err(CatalogError::UnknownPhase {
                        phase: phase.to_string(),
                    });
                }
            }
            rxn.classify_gases(set.phases.gas_phases())?;
            set.insert(rxn);
        }
        let missing: Vec<String> = set
            .phases
            .phases()
            .iter()
            .filter(|p| !set.phases.is_gas(p) && set.identity_for(p).is_none())
            .cloned()
            .collect();
        for phase in missing {
            set.insert(Reaction::identity(&phase, IDENTITY_STRENGTH)?);
        }
        for group in set.groups.values_mut() {
            group.sort_by(|a, b| b.competitiveness().total_cmp(&a.competitiveness()));
        }
        Ok(set)
    }

    /// Parse a set from JSON of the form `{"phases": {...}, "reactions": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let record: ReactionSetRecord = serde_json::from_str(json)?;
        Self::new(record.reactions, Arc::new(record.phases))
    }

    /// Serialize to the JSON form accepted by [`ReactionSet::from_json`].
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let record = ReactionSetRecord {
            phases: (*self.phases).clone(),
            reactions: self.reactions().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&record)?)
    }

    fn insert(&mut self, rxn: Reaction) {
        self.groups.entry(rxn.reactant_key()).or_default().push(rxn);
    }

    /// The phase catalog these reactions were scored against.
    pub fn phases(&self) -> &Arc<PhaseSet> {
        &self.phases
    }

    /// All reactions whose reactant set is exactly `reactants`, most
    /// competitive first. Duplicates in `reactants` are ignored.
    pub fn get_reactions(&self, reactants: &[&str]) -> &[Reaction] {
        let mut key: Vec<&str> = reactants.to_vec();
        key.sort_unstable();
        key.dedup();
        self.lookup(&key)
    }

    /// Reactions between two phases (one phase if they are equal).
    ///
    /// Allocation-free form of [`ReactionSet::get_reactions`] for the
    /// pairwise interactions of the hot loop.
    pub fn reactions_between(&self, a: &str, b: &str) -> &[Reaction] {
        match a.cmp(b) {
            std::cmp::Ordering::Equal => self.lookup(&[a]),
            std::cmp::Ordering::Less => self.lookup(&[a, b]),
            std::cmp::Ordering::Greater => self.lookup(&[b, a]),
        }
    }

    fn lookup(&self, sorted: &[&str]) -> &[Reaction] {
        self.groups
            .get(&ReactantKey(sorted))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The identity reaction of `phase`, if present.
    pub fn identity_for(&self, phase: &str) -> Option<&Reaction> {
        self.lookup(&[phase]).iter().find(|r| r.is_identity())
    }

    /// Look up a reaction by its display string, e.g. `1BaO->1BaO`.
    pub fn get_by_str(&self, display: &str) -> Option<&Reaction> {
        self.reactions().find(|r| r.to_string() == display)
    }

    /// Every reaction, grouped by reactant set.
    pub fn reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.groups.values().flatten()
    }

    /// Reactions producing all of `products`.
    pub fn search_products(&self, products: &[&str]) -> Vec<&Reaction> {
        self.reactions()
            .filter(|r| products.iter().all(|p| r.products().contains_key(*p)))
            .collect()
    }

    /// Reactions consuming all of `reactants` (possibly among others).
    pub fn search_reactants(&self, reactants: &[&str]) -> Vec<&Reaction> {
        self.reactions()
            .filter(|r| reactants.iter().all(|p| r.reactants().contains_key(*p)))
            .collect()
    }

    /// Total number of reactions, identities included.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Whether the set holds no reactions.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct ReactionSetRecord {
    phases: PhaseSet,
    reactions: Vec<Reaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases() -> Arc<PhaseSet> {
        Arc::new(
            PhaseSet::builder()
                .phase("A", 1.0)
                .phase("B", 1.0)
                .phase("AB", 2.0)
                .phase("A2B", 3.0)
                .build()
                .unwrap(),
        )
    }

    fn set() -> ReactionSet {
        ReactionSet::new(
            vec![
                Reaction::from_pairs(&[("A", 1.0), ("B", 1.0)], &[("AB", 2.0)], 1.0).unwrap(),
                Reaction::from_pairs(&[("B", 1.0), ("A", 2.0)], &[("A2B", 3.0)], 4.0).unwrap(),
            ],
            phases(),
        )
        .unwrap()
    }

    #[test]
    fn identities_are_synthesized() {
        let s = set();
        for p in ["A", "B", "AB", "A2B"] {
            let id = s.identity_for(p).unwrap();
            assert_eq!(id.competitiveness(), IDENTITY_STRENGTH);
        }
        assert_eq!(s.len(), 6);
        assert!(s.identity_for("O2").is_none());
    }

    #[test]
    fn existing_identity_is_kept() {
        let s = ReactionSet::new(vec![Reaction::identity("A", 5.0).unwrap()], phases()).unwrap();
        assert_eq!(s.identity_for("A").unwrap().competitiveness(), 5.0);
        assert_eq!(s.get_reactions(&["A"]).len(), 1);
    }

    #[test]
    fn lookup_is_order_insensitive_and_sorted() {
        let s = set();
        let fwd = s.get_reactions(&["A", "B"]);
        let rev = s.reactions_between("B", "A");
        assert_eq!(fwd, rev);
        assert_eq!(fwd.len(), 2);
        assert_eq!(fwd[0].competitiveness(), 4.0);
        assert_eq!(fwd[1].competitiveness(), 1.0);
        assert!(s.reactions_between("A", "AB").is_empty());
        assert_eq!(s.reactions_between("A", "A").len(), 1);
        assert_eq!(s.get_reactions(&["A", "A"]).len(), 1);
    }

    #[test]
    fn unknown_phase_rejected() {
        let err = ReactionSet::new(
            vec![Reaction::from_pairs(&[("A", 1.0), ("Z", 1.0)], &[("AB", 2.0)], 1.0).unwrap()],
            phases(),
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::UnknownPhase { phase: "Z".into() });
    }

    #[test]
    fn searches() {
        let s = set();
        assert_eq!(s.search_products(&["A2B"]).len(), 1);
        assert_eq!(s.search_reactants(&["B"]).len(), 3);
        assert!(s.get_by_str("1A+1B->2AB").is_some());
    }

    #[test]
    fn json_round_trip() {
        let s = set();
        let back = ReactionSet::from_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(back.len(), s.len());
        assert_eq!(
            back.get_reactions(&["A", "B"]),
            s.get_reactions(&["A", "B"])
        );
    }
}
