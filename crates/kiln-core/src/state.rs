//! Per-site and general simulation state.
//!
//! A [`SimulationState`] is a dense vector of [`SiteState`] records indexed
//! by [`SiteId`] plus one [`GeneralState`] record holding the global
//! scalars and ledgers. Both halves are mutated only through
//! [`SimulationState::apply`].

use crate::diff::StateDiff;
use crate::error::SimError;
use crate::id::SiteId;
use indexmap::IndexMap;

/// Reserved phase name for an unoccupied cell.
pub const FREE_SPACE: &str = "Free Space";

/// Phase name to volume map used by every ledger and accounting query.
pub type PhaseVolumes = IndexMap<String, f64>;

/// The occupant of one grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteState {
    /// Occupying phase name, or [`FREE_SPACE`].
    pub phase: String,
    /// Nominal cell volume. Scaled by the volume multiplier for absolute
    /// accounting.
    pub volume: f64,
}

impl SiteState {
    /// A cell occupied by `phase` with the given nominal volume.
    pub fn new(phase: impl Into<String>, volume: f64) -> Self {
        Self {
            phase: phase.into(),
            volume,
        }
    }

    /// An empty cell. Free space carries a nominal volume of 1.0 that is
    /// ignored by all accounting.
    pub fn free() -> Self {
        Self::new(FREE_SPACE, 1.0)
    }

    /// Whether this cell holds no material.
    pub fn is_free(&self) -> bool {
        self.phase == FREE_SPACE
    }
}

/// Global scalars and ledgers carried alongside the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneralState {
    /// Current temperature in kelvin.
    pub temperature: f64,
    /// Scale from nominal cell volume to absolute volume.
    pub vol_multiplier: f64,
    /// Absolute volume of gas released by reactions, per phase.
    pub gases_evolved: PhaseVolumes,
    /// Absolute volume of atmospheric gas taken up by reactions, per phase.
    pub gases_consumed: PhaseVolumes,
    /// Absolute volume of material removed from the grid as liquid.
    pub melted_volumes: PhaseVolumes,
}

impl Default for GeneralState {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            vol_multiplier: 1.0,
            gases_evolved: PhaseVolumes::new(),
            gases_consumed: PhaseVolumes::new(),
            melted_volumes: PhaseVolumes::new(),
        }
    }
}

/// Complete state of one realization at one step.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    /// Site records, indexed by [`SiteId`].
    pub sites: Vec<SiteState>,
    /// Global scalars and ledgers.
    pub general: GeneralState,
}

impl SimulationState {
    /// Build a state from explicit site records.
    pub fn new(sites: Vec<SiteState>, general: GeneralState) -> Self {
        Self { sites, general }
    }

    /// A grid of `cell_count` free cells with default general state.
    pub fn all_free(cell_count: usize) -> Self {
        Self::new(vec![SiteState::free(); cell_count], GeneralState::default())
    }

    /// Number of sites in the grid.
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Look up one site.
    pub fn site(&self, id: SiteId) -> Option<&SiteState> {
        self.sites.get(id.index())
    }

    /// Look up one site, failing with [`SimError::InvalidSite`].
    pub fn try_site(&self, id: SiteId) -> Result<&SiteState, SimError> {
        self.site(id).ok_or(SimError::InvalidSite {
            site: id,
            site_count: self.sites.len(),
        })
    }

    /// Apply a diff in place.
    ///
    /// Site entries overwrite whole records; general entries that are
    /// `Some` overwrite the corresponding field. The diff is validated
    /// before any mutation, so on error the state is untouched.
    pub fn apply(&mut self, diff: &StateDiff) -> Result<(), SimError> {
        if let Some(bad) = diff.sites.keys().find(|id| id.index() >= self.sites.len()) {
            return Err(SimError::InvalidSite {
                site: *bad,
                site_count: self.sites.len(),
            });
        }
        for (id, site) in &diff.sites {
            self.sites[id.index()] = site.clone();
        }
        diff.general.apply_to(&mut self.general);
        Ok(())
    }

    // ── Accounting ──────────────────────────────────────────────

    /// Nominal volume per phase on the grid, free space excluded.
    pub fn grid_volumes(&self) -> PhaseVolumes {
        let mut out = PhaseVolumes::new();
        for site in self.sites.iter().filter(|s| !s.is_free()) {
            *out.entry(site.phase.clone()).or_insert(0.0) += site.volume;
        }
        out
    }

    /// Absolute volume per phase on the grid.
    pub fn absolute_grid_volumes(&self) -> PhaseVolumes {
        let mult = self.general.vol_multiplier;
        self.grid_volumes()
            .into_iter()
            .map(|(p, v)| (p, v * mult))
            .collect()
    }

    /// Absolute volume per phase on the grid plus the melted ledger.
    pub fn absolute_phase_volumes(&self) -> PhaseVolumes {
        let mut out = self.absolute_grid_volumes();
        for (phase, v) in &self.general.melted_volumes {
            *out.entry(phase.clone()).or_insert(0.0) += v;
        }
        out
    }

    /// Total conserved volume: grid plus melted plus evolved, less
    /// consumed atmosphere.
    ///
    /// Constant across every tick of a volume-balanced reaction set.
    pub fn total_conserved_volume(&self) -> f64 {
        let g = &self.general;
        self.absolute_phase_volumes().values().sum::<f64>()
            + g.gases_evolved.values().sum::<f64>()
            - g.gases_consumed.values().sum::<f64>()
    }

    /// Number of cells occupied by each phase, free space included.
    pub fn cell_counts(&self) -> IndexMap<String, usize> {
        let mut out = IndexMap::new();
        for site in &self.sites {
            *out.entry(site.phase.clone()).or_insert(0) += 1;
        }
        out
    }

    /// Distinct non-free phases occupying at least one cell.
    pub fn phases_present(&self) -> Vec<String> {
        self.grid_volumes().into_keys().collect()
    }

    /// Ids of every free cell.
    pub fn free_sites(&self) -> Vec<SiteId> {
        self.sites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_free())
            .map(|(i, _)| SiteId(i as u32))
            .collect()
    }
}
