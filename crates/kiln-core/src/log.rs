//! Append-only result log rooted at an initial state.

use crate::diff::StateDiff;
use crate::error::SimError;
use crate::state::SimulationState;

/// An initial state followed by one diff per applied step.
///
/// Step `k` of the log is the state after applying the first `k` diffs
/// to the initial state; step 0 is the initial state itself. The log
/// caches the state at its tail so appending does not require replay.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultLog {
    initial: SimulationState,
    diffs: Vec<StateDiff>,
    last: SimulationState,
}

impl ResultLog {
    /// Start a log at `initial`.
    pub fn new(initial: SimulationState) -> Self {
        Self {
            last: initial.clone(),
            initial,
            diffs: Vec::new(),
        }
    }

    /// Rebuild a log from its parts, replaying to validate every diff.
    pub fn from_parts(initial: SimulationState, diffs: Vec<StateDiff>) -> Result<Self, SimError> {
        let mut last = initial.clone();
        for diff in &diffs {
            last.apply(diff)?;
        }
        Ok(Self {
            initial,
            diffs,
            last,
        })
    }

    /// Apply `diff` to the tail state and record it.
    pub fn push(&mut self, diff: StateDiff) -> Result<(), SimError> {
        self.last.apply(&diff)?;
        self.diffs.push(diff);
        Ok(())
    }

    /// Append another log whose initial state continues this one.
    ///
    /// A boundary diff from this log's tail to `other`'s initial state is
    /// recorded first, then `other`'s diffs, so the concatenation replays
    /// as one continuous trace.
    pub fn extend_with(&mut self, other: ResultLog) -> Result<(), SimError> {
        let boundary = StateDiff::between(&self.last, &other.initial);
        self.push(boundary)?;
        self.diffs.extend(other.diffs);
        self.last = other.last;
        Ok(())
    }

    /// The root state.
    pub fn initial_state(&self) -> &SimulationState {
        &self.initial
    }

    /// The state after every recorded diff.
    pub fn final_state(&self) -> &SimulationState {
        &self.last
    }

    /// Recorded diffs in order.
    pub fn diffs(&self) -> &[StateDiff] {
        &self.diffs
    }

    /// Number of recorded diffs.
    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    /// Whether no diff has been recorded.
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Reconstruct the state at `step` by sequential replay.
    ///
    /// Returns `None` if `step > len()`.
    pub fn state_at(&self, step: usize) -> Option<SimulationState> {
        if step > self.diffs.len() {
            return None;
        }
        if step == self.diffs.len() {
            return Some(self.last.clone());
        }
        let mut state = self.initial.clone();
        for diff in &self.diffs[..step] {
            // Every stored diff was validated on push.
            state.apply(diff).ok()?;
        }
        Some(state)
    }

    /// Split into the initial state and the diff sequence.
    pub fn into_parts(self) -> (SimulationState, Vec<StateDiff>) {
        (self.initial, self.diffs)
    }
}
