//! Runtime error taxonomy for the reaction automaton.
//!
//! Every variant is fatal to the realization that raised it: the state is
//! either fully consistent or the run stops.

use crate::id::SiteId;
use std::error::Error;
use std::fmt;

/// Errors raised while setting up or advancing a simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// A phase on the grid or in a request is absent from the phase catalog.
    UnknownPhase {
        /// The unrecognised phase name.
        phase: String,
    },
    /// An occupied phase has no reaction at all, not even its identity.
    MissingReaction {
        /// The phase lacking a catalog entry.
        phase: String,
    },
    /// A catalog or configuration is inconsistent.
    Config {
        /// What is wrong.
        reason: String,
    },
    /// Every candidate of a weighted choice had zero weight.
    DegenerateWeights {
        /// What was being chosen.
        context: String,
    },
    /// A site id outside the grid was referenced.
    InvalidSite {
        /// The offending id.
        site: SiteId,
        /// Number of sites in the grid.
        site_count: usize,
    },
    /// Volume tuning exhausted its retry budget.
    Convergence {
        /// Phase furthest from its target at the end of the last round.
        phase: String,
        /// Absolute deviation of that phase from its target.
        deviation: f64,
        /// Tuning rounds attempted.
        rounds: usize,
    },
    /// A per-phase absolute volume changed across a regrind.
    Conservation {
        /// The phase whose volume changed.
        phase: String,
        /// Absolute volume before.
        before: f64,
        /// Absolute volume after.
        after: f64,
    },
    /// Grid construction could not make progress.
    Setup {
        /// What went wrong.
        reason: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPhase { phase } => write!(f, "phase '{phase}' is not in the phase catalog"),
            Self::MissingReaction { phase } => {
                write!(f, "no reaction (including identity) available for phase '{phase}'")
            }
            Self::Config { reason } => write!(f, "configuration error: {reason}"),
            Self::DegenerateWeights { context } => {
                write!(f, "all candidate weights are zero when choosing {context}")
            }
            Self::InvalidSite { site, site_count } => {
                write!(f, "site {site} out of range for grid of {site_count} sites")
            }
            Self::Convergence {
                phase,
                deviation,
                rounds,
            } => write!(
                f,
                "volume tuning did not converge after {rounds} rounds: \
                 '{phase}' still off target by {deviation}"
            ),
            Self::Conservation {
                phase,
                before,
                after,
            } => write!(
                f,
                "volume not conserved for '{phase}': {before} -> {after}"
            ),
            Self::Setup { reason } => write!(f, "setup failed: {reason}"),
        }
    }
}

impl Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_phase() {
        let e = SimError::Conservation {
            phase: "NaCl".into(),
            before: 1.0,
            after: 0.5,
        };
        assert!(e.to_string().contains("NaCl"));
        let e = SimError::MissingReaction {
            phase: "BaO".into(),
        };
        assert!(e.to_string().contains("BaO"));
    }
}
