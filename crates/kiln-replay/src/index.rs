//! Checkpointed random access into a result log.

use kiln_core::{ResultLog, SimulationState, StateDiff};

use crate::error::ReplayError;
use crate::records::LogRecord;

/// A diff chain with a full state stored every `interval` steps.
///
/// [`state_at`](Self::state_at) starts from the nearest checkpoint at or
/// before the requested step, so it replays at most `interval - 1` diffs.
/// Memory grows by one state per checkpoint.
///
/// # Examples
///
/// ```
/// use kiln_core::{GeneralState, ResultLog, SimulationState, SiteId, SiteState, StateDiff};
/// use kiln_replay::StateIndex;
///
/// let mut log = ResultLog::new(SimulationState::new(
///     vec![SiteState::new("A", 1.0)],
///     GeneralState::default(),
/// ));
/// for step in 1..=10 {
///     let mut diff = StateDiff::empty();
///     diff.set_site(SiteId(0), SiteState::new("A", step as f64));
///     log.push(diff).unwrap();
/// }
/// let index = StateIndex::build(&log, 4).unwrap();
/// assert_eq!(index.checkpoint_count(), 3);
/// assert_eq!(index.state_at(7).unwrap().sites[0].volume, 7.0);
/// assert_eq!(index.replay_cost(7), Some(3));
/// ```
#[derive(Clone, Debug)]
pub struct StateIndex {
    interval: usize,
    checkpoints: Vec<SimulationState>,
    diffs: Vec<StateDiff>,
}

impl StateIndex {
    /// Index `log` with a checkpoint every `interval` steps.
    pub fn build(log: &ResultLog, interval: usize) -> Result<Self, ReplayError> {
        Self::from_parts(log.initial_state().clone(), log.diffs().to_vec(), interval)
    }

    /// Index a parsed record without first building a [`ResultLog`].
    pub fn from_record(record: LogRecord, interval: usize) -> Result<Self, ReplayError> {
        let (initial, diffs) = record.into_parts()?;
        Self::from_parts(initial, diffs, interval)
    }

    /// Index an initial state and its diffs, validating every diff.
    ///
    /// # Errors
    ///
    /// [`ReplayError::InvalidInterval`] for `interval == 0`, and
    /// [`ReplayError::Sim`] for a diff that cannot be applied.
    pub fn from_parts(
        initial: SimulationState,
        diffs: Vec<StateDiff>,
        interval: usize,
    ) -> Result<Self, ReplayError> {
        if interval == 0 {
            return Err(ReplayError::InvalidInterval);
        }
        let mut checkpoints = Vec::with_capacity(diffs.len() / interval + 1);
        let mut state = initial;
        checkpoints.push(state.clone());
        for (i, diff) in diffs.iter().enumerate() {
            state.apply(diff)?;
            if (i + 1) % interval == 0 {
                checkpoints.push(state.clone());
            }
        }
        Ok(Self {
            interval,
            checkpoints,
            diffs,
        })
    }

    /// Steps between checkpoints.
    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Stored checkpoints, the initial state included.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Number of diffs; valid steps are `0..=len()`.
    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    /// Whether the indexed log has no diffs.
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Diffs replayed to reach `step`, or `None` past the end.
    pub fn replay_cost(&self, step: usize) -> Option<usize> {
        (step <= self.diffs.len()).then_some(step % self.interval)
    }

    /// The state after `step` diffs, or `None` past the end.
    pub fn state_at(&self, step: usize) -> Option<SimulationState> {
        if step > self.diffs.len() {
            return None;
        }
        let base = step / self.interval;
        let mut state = self.checkpoints.get(base)?.clone();
        for diff in &self.diffs[base * self.interval..step] {
            // Every diff was applied once during indexing.
            state.apply(diff).ok()?;
        }
        Some(state)
    }

    /// Rebuild the plain log.
    pub fn to_log(&self) -> Result<ResultLog, ReplayError> {
        let initial = self.checkpoints.first().cloned().ok_or_else(|| ReplayError::MalformedRecord {
            detail: "index holds no initial state".to_string(),
        })?;
        Ok(ResultLog::from_parts(initial, self.diffs.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{GeneralState, SiteId, SiteState};
    use proptest::prelude::*;

    fn counting_log(steps: usize) -> ResultLog {
        let mut log = ResultLog::new(SimulationState::new(
            vec![SiteState::new("A", 0.0), SiteState::new("B", 0.0)],
            GeneralState::default(),
        ));
        for step in 1..=steps {
            let mut diff = StateDiff::empty();
            diff.set_site(SiteId((step % 2) as u32), SiteState::new("A", step as f64));
            if step % 5 == 0 {
                diff.general.temperature = Some(step as f64);
            }
            log.push(diff).unwrap();
        }
        log
    }

    #[test]
    fn zero_interval_is_rejected() {
        match StateIndex::build(&counting_log(3), 0) {
            Err(ReplayError::InvalidInterval) => {}
            other => panic!("expected InvalidInterval, got {other:?}"),
        }
    }

    #[test]
    fn checkpoints_land_on_multiples() {
        let index = StateIndex::build(&counting_log(12), 4).unwrap();
        // Steps 0, 4, 8, 12.
        assert_eq!(index.checkpoint_count(), 4);
        assert_eq!(index.replay_cost(12), Some(0));
        assert_eq!(index.replay_cost(11), Some(3));
        assert_eq!(index.replay_cost(13), None);
        assert!(index.state_at(13).is_none());
    }

    #[test]
    fn to_log_round_trips() {
        let log = counting_log(9);
        assert_eq!(StateIndex::build(&log, 2).unwrap().to_log().unwrap(), log);
    }

    proptest! {
        #[test]
        fn matches_sequential_replay(steps in 0usize..40, interval in 1usize..10, probe in 0usize..41) {
            let log = counting_log(steps);
            let index = StateIndex::build(&log, interval).unwrap();
            prop_assert_eq!(index.state_at(probe), log.state_at(probe));
            if probe <= steps {
                prop_assert!(index.replay_cost(probe).unwrap() < interval);
            }
        }
    }
}
