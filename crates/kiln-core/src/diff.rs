//! State diffs: the only channel through which simulation state changes.
//!
//! A [`StateDiff`] carries replacement records for the sites that changed
//! and a [`GeneralDiff`] for the global scalars and ledgers. Ledger entries
//! replace the whole map rather than adding to it, so applying the same
//! diff twice is idempotent.

use crate::id::SiteId;
use crate::state::{GeneralState, PhaseVolumes, SimulationState, SiteState};
use indexmap::IndexMap;

/// Replacement values for fields of [`GeneralState`].
///
/// `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneralDiff {
    /// New temperature.
    pub temperature: Option<f64>,
    /// New volume multiplier.
    pub vol_multiplier: Option<f64>,
    /// Replacement gas-evolved ledger.
    pub gases_evolved: Option<PhaseVolumes>,
    /// Replacement gas-consumed ledger.
    pub gases_consumed: Option<PhaseVolumes>,
    /// Replacement melted-volume ledger.
    pub melted_volumes: Option<PhaseVolumes>,
}

impl GeneralDiff {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.vol_multiplier.is_none()
            && self.gases_evolved.is_none()
            && self.gases_consumed.is_none()
            && self.melted_volumes.is_none()
    }

    /// Overwrite the fields of `general` that this diff sets.
    pub fn apply_to(&self, general: &mut GeneralState) {
        if let Some(t) = self.temperature {
            general.temperature = t;
        }
        if let Some(m) = self.vol_multiplier {
            general.vol_multiplier = m;
        }
        if let Some(g) = &self.gases_evolved {
            general.gases_evolved = g.clone();
        }
        if let Some(g) = &self.gases_consumed {
            general.gases_consumed = g.clone();
        }
        if let Some(m) = &self.melted_volumes {
            general.melted_volumes = m.clone();
        }
    }

    /// Fields of `to` that differ from `from`.
    pub fn between(from: &GeneralState, to: &GeneralState) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }
        Self {
            temperature: changed(&from.temperature, &to.temperature),
            vol_multiplier: changed(&from.vol_multiplier, &to.vol_multiplier),
            gases_evolved: changed(&from.gases_evolved, &to.gases_evolved),
            gases_consumed: changed(&from.gases_consumed, &to.gases_consumed),
            melted_volumes: changed(&from.melted_volumes, &to.melted_volumes),
        }
    }

    /// Every field of `general`.
    pub fn full(general: &GeneralState) -> Self {
        Self {
            temperature: Some(general.temperature),
            vol_multiplier: Some(general.vol_multiplier),
            gases_evolved: Some(general.gases_evolved.clone()),
            gases_consumed: Some(general.gases_consumed.clone()),
            melted_volumes: Some(general.melted_volumes.clone()),
        }
    }

    /// Fold a later diff into this one; fields the later diff sets win.
    pub fn merge(&mut self, later: &GeneralDiff) {
        if later.temperature.is_some() {
            self.temperature = later.temperature;
        }
        if later.vol_multiplier.is_some() {
            self.vol_multiplier = later.vol_multiplier;
        }
        if later.gases_evolved.is_some() {
            self.gases_evolved.clone_from(&later.gases_evolved);
        }
        if later.gases_consumed.is_some() {
            self.gases_consumed.clone_from(&later.gases_consumed);
        }
        if later.melted_volumes.is_some() {
            self.melted_volumes.clone_from(&later.melted_volumes);
        }
    }
}

/// A set of site replacements plus general-state replacements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateDiff {
    /// Replacement site records, in the order they were written.
    pub sites: IndexMap<SiteId, SiteState>,
    /// Replacement general-state fields.
    pub general: GeneralDiff,
}

impl StateDiff {
    /// A diff that changes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether applying this diff would change nothing.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty() && self.general.is_empty()
    }

    /// Record a replacement for one site.
    pub fn set_site(&mut self, id: SiteId, site: SiteState) {
        self.sites.insert(id, site);
    }

    /// The diff that turns `from` into `to`.
    ///
    /// Sites are compared index by index; any site present only in `to`
    /// is included.
    pub fn between(from: &SimulationState, to: &SimulationState) -> Self {
        let sites = to
            .sites
            .iter()
            .enumerate()
            .filter(|(i, site)| from.sites.get(*i) != Some(*site))
            .map(|(i, site)| (SiteId(i as u32), site.clone()))
            .collect();
        Self {
            sites,
            general: GeneralDiff::between(&from.general, &to.general),
        }
    }

    /// A diff that writes every field of `state`.
    pub fn full(state: &SimulationState) -> Self {
        Self {
            sites: state
                .sites
                .iter()
                .enumerate()
                .map(|(i, site)| (SiteId(i as u32), site.clone()))
                .collect(),
            general: GeneralDiff::full(&state.general),
        }
    }

    /// Fold a later diff into this one.
    pub fn merge(&mut self, later: &StateDiff) {
        for (id, site) in &later.sites {
            self.sites.insert(*id, site.clone());
        }
        self.general.merge(&later.general);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(phases: &[(&str, f64)]) -> SimulationState {
        SimulationState::new(
            phases.iter().map(|(p, v)| SiteState::new(*p, *v)).collect(),
            GeneralState::default(),
        )
    }

    #[test]
    fn empty_diff_is_empty() {
        assert!(StateDiff::empty().is_empty());
        let mut d = StateDiff::empty();
        d.general.temperature = Some(900.0);
        assert!(!d.is_empty());
    }

    #[test]
    fn between_captures_only_changes() {
        let a = grid(&[("A", 1.0), ("B", 1.0), ("C", 1.0)]);
        let mut b = a.clone();
        b.sites[1] = SiteState::new("D", 1.5);
        b.general.melted_volumes.insert("C".into(), 2.0);
        let d = StateDiff::between(&a, &b);
        assert_eq!(d.sites.len(), 1);
        assert_eq!(d.sites[&SiteId(1)].phase, "D");
        assert!(d.general.temperature.is_none());
        assert!(d.general.melted_volumes.is_some());
    }

    #[test]
    fn ledger_replacement_is_idempotent() {
        let mut state = grid(&[("A", 1.0)]);
        let mut d = StateDiff::empty();
        let mut ledger = PhaseVolumes::new();
        ledger.insert("CO2".into(), 0.25);
        d.general.gases_evolved = Some(ledger);
        state.apply(&d).unwrap();
        state.apply(&d).unwrap();
        assert_eq!(state.general.gases_evolved["CO2"], 0.25);
    }

    #[test]
    fn merge_prefers_later_writes() {
        let mut first = StateDiff::empty();
        first.set_site(SiteId(0), SiteState::new("A", 1.0));
        first.general.temperature = Some(300.0);
        let mut second = StateDiff::empty();
        second.set_site(SiteId(0), SiteState::new("B", 2.0));
        second.general.vol_multiplier = Some(0.5);
        first.merge(&second);
        assert_eq!(first.sites[&SiteId(0)].phase, "B");
        assert_eq!(first.general.temperature, Some(300.0));
        assert_eq!(first.general.vol_multiplier, Some(0.5));
    }

    proptest! {
        #[test]
        fn between_then_apply_reaches_target(
            from in prop::collection::vec(0u8..4, 1..20),
            to_seed in prop::collection::vec(0u8..4, 1..20),
            temp in 0.0f64..2000.0,
        ) {
            let n = from.len();
            let name = |k: u8| ["A", "B", "C", crate::state::FREE_SPACE][k as usize];
            let a = SimulationState::new(
                from.iter().map(|k| SiteState::new(name(*k), 1.0)).collect(),
                GeneralState::default(),
            );
            let mut b = a.clone();
            for (i, k) in to_seed.iter().take(n).enumerate() {
                b.sites[i] = SiteState::new(name(*k), 0.5 + *k as f64);
            }
            b.general.temperature = temp;
            let mut replay = a.clone();
            replay.apply(&StateDiff::between(&a, &b)).unwrap();
            prop_assert_eq!(replay, b);
        }
    }
}
