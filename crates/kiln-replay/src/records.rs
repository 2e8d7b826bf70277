//! Serializable mirrors of the core state and diff types.
//!
//! `kiln-core` carries no serde dependency; these records are the wire
//! form and convert to and from the core types.

use indexmap::IndexMap;
use kiln_core::{
    GeneralDiff, GeneralState, PhaseVolumes, ResultLog, SimulationState, SiteId, SiteState, StateDiff,
};
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// One cell: its phase and nominal volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Phase name.
    pub phase: String,
    /// Nominal volume.
    pub volume: f64,
}

impl From<&SiteState> for SiteRecord {
    fn from(site: &SiteState) -> Self {
        Self {
            phase: site.phase.clone(),
            volume: site.volume,
        }
    }
}

impl From<SiteRecord> for SiteState {
    fn from(record: SiteRecord) -> Self {
        SiteState::new(record.phase, record.volume)
    }
}

/// Global scalars and ledgers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneralRecord {
    /// Temperature in kelvin.
    pub temperature: f64,
    /// Volume multiplier.
    pub vol_multiplier: f64,
    /// Gas-evolved ledger.
    #[serde(default)]
    pub gases_evolved: PhaseVolumes,
    /// Gas-consumed ledger.
    #[serde(default)]
    pub gases_consumed: PhaseVolumes,
    /// Melted-volume ledger.
    #[serde(default)]
    pub melted_volumes: PhaseVolumes,
}

impl From<&GeneralState> for GeneralRecord {
    fn from(g: &GeneralState) -> Self {
        Self {
            temperature: g.temperature,
            vol_multiplier: g.vol_multiplier,
            gases_evolved: g.gases_evolved.clone(),
            gases_consumed: g.gases_consumed.clone(),
            melted_volumes: g.melted_volumes.clone(),
        }
    }
}

impl From<GeneralRecord> for GeneralState {
    fn from(r: GeneralRecord) -> Self {
        GeneralState {
            temperature: r.temperature,
            vol_multiplier: r.vol_multiplier,
            gases_evolved: r.gases_evolved,
            gases_consumed: r.gases_consumed,
            melted_volumes: r.melted_volumes,
        }
    }
}

/// A full grid keyed by decimal site id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Every site, keyed `"0"`, `"1"`, ...
    pub sites: IndexMap<String, SiteRecord>,
    /// Global state.
    pub general: GeneralRecord,
}

impl From<&SimulationState> for StateRecord {
    fn from(state: &SimulationState) -> Self {
        Self {
            sites: state
                .sites
                .iter()
                .enumerate()
                .map(|(i, s)| (i.to_string(), SiteRecord::from(s)))
                .collect(),
            general: GeneralRecord::from(&state.general),
        }
    }
}

impl StateRecord {
    /// Convert to a state, checking ids cover `0..n` exactly once.
    pub fn into_state(self) -> Result<SimulationState, ReplayError> {
        let n = self.sites.len();
        let mut slots: Vec<Option<SiteState>> = vec![None; n];
        for (key, site) in self.sites {
            let id = parse_site_id(&key)?;
            let Some(slot) = slots.get_mut(id.index()) else {
                return Err(ReplayError::MalformedRecord {
                    detail: format!("site {key} is outside a grid of {n} sites"),
                });
            };
            if slot.is_some() {
                return Err(ReplayError::MalformedRecord {
                    detail: format!("site {key} appears twice"),
                });
            }
            *slot = Some(site.into());
        }
        // n keys, each in range and distinct, so every slot is filled.
        let sites = slots.into_iter().flatten().collect();
        Ok(SimulationState::new(sites, self.general.into()))
    }
}

/// Changed fields of the general state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralDiffRecord {
    /// New temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// New volume multiplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol_multiplier: Option<f64>,
    /// Replacement gas-evolved ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gases_evolved: Option<PhaseVolumes>,
    /// Replacement gas-consumed ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gases_consumed: Option<PhaseVolumes>,
    /// Replacement melted-volume ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub melted_volumes: Option<PhaseVolumes>,
}

impl From<&GeneralDiff> for GeneralDiffRecord {
    fn from(d: &GeneralDiff) -> Self {
        Self {
            temperature: d.temperature,
            vol_multiplier: d.vol_multiplier,
            gases_evolved: d.gases_evolved.clone(),
            gases_consumed: d.gases_consumed.clone(),
            melted_volumes: d.melted_volumes.clone(),
        }
    }
}

impl From<GeneralDiffRecord> for GeneralDiff {
    fn from(r: GeneralDiffRecord) -> Self {
        GeneralDiff {
            temperature: r.temperature,
            vol_multiplier: r.vol_multiplier,
            gases_evolved: r.gases_evolved,
            gases_consumed: r.gases_consumed,
            melted_volumes: r.melted_volumes,
        }
    }
}

/// One step's changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    /// Replacement sites keyed by decimal id.
    #[serde(default)]
    pub sites: IndexMap<String, SiteRecord>,
    /// Changed general fields.
    #[serde(default)]
    pub general: GeneralDiffRecord,
}

impl From<&StateDiff> for DiffRecord {
    fn from(diff: &StateDiff) -> Self {
        Self {
            sites: diff
                .sites
                .iter()
                .map(|(id, s)| (id.0.to_string(), SiteRecord::from(s)))
                .collect(),
            general: GeneralDiffRecord::from(&diff.general),
        }
    }
}

impl DiffRecord {
    /// Convert to a diff. Ids are range-checked when the diff is applied.
    pub fn into_diff(self) -> Result<StateDiff, ReplayError> {
        let mut diff = StateDiff::empty();
        for (key, site) in self.sites {
            diff.set_site(parse_site_id(&key)?, site.into());
        }
        diff.general = self.general.into();
        Ok(diff)
    }
}

/// A whole log: initial state and diffs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Step 0.
    pub initial_state: StateRecord,
    /// One entry per step.
    #[serde(default)]
    pub diffs: Vec<DiffRecord>,
}

impl From<&ResultLog> for LogRecord {
    fn from(log: &ResultLog) -> Self {
        Self {
            initial_state: StateRecord::from(log.initial_state()),
            diffs: log.diffs().iter().map(DiffRecord::from).collect(),
        }
    }
}

impl LogRecord {
    /// Split into a validated initial state and converted diffs, without
    /// replaying them.
    pub fn into_parts(self) -> Result<(SimulationState, Vec<StateDiff>), ReplayError> {
        let initial = self.initial_state.into_state()?;
        let diffs = self
            .diffs
            .into_iter()
            .map(DiffRecord::into_diff)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((initial, diffs))
    }

    /// Convert to a log, replaying every diff to validate it.
    pub fn into_log(self) -> Result<ResultLog, ReplayError> {
        let (initial, diffs) = self.into_parts()?;
        Ok(ResultLog::from_parts(initial, diffs)?)
    }
}

fn parse_site_id(key: &str) -> Result<SiteId, ReplayError> {
    key.parse::<u32>()
        .map(SiteId)
        .map_err(|_| ReplayError::MalformedRecord {
            detail: format!("site id '{key}' is not a non-negative integer"),
        })
}
