//! Catalog construction and lookup errors.

use kiln_core::SimError;
use std::error::Error;
use std::fmt;

/// Errors raised while building, loading or querying a catalog.
#[derive(Clone, Debug, PartialEq)]
pub enum CatalogError {
    /// A phase is not in the phase catalog.
    UnknownPhase {
        /// The unrecognised phase.
        phase: String,
    },
    /// A phase volume is missing, non-positive or non-finite.
    InvalidVolume {
        /// The phase.
        phase: String,
        /// The rejected volume.
        volume: f64,
    },
    /// A chemical formula could not be parsed.
    InvalidFormula {
        /// The formula text.
        formula: String,
        /// What went wrong.
        reason: String,
    },
    /// A reaction is malformed.
    InvalidReaction {
        /// Display form of the reaction.
        reaction: String,
        /// What went wrong.
        reason: String,
    },
    /// A reaction library has no entry for the requested temperature.
    MissingTemperature {
        /// The requested temperature.
        temperature: f64,
    },
    /// JSON (de)serialization failed.
    Json {
        /// The serde_json error message.
        reason: String,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPhase { phase } => write!(f, "unknown phase '{phase}'"),
            Self::InvalidVolume { phase, volume } => {
                write!(f, "invalid molar volume {volume} for phase '{phase}'")
            }
            Self::InvalidFormula { formula, reason } => {
                write!(f, "cannot parse formula '{formula}': {reason}")
            }
            Self::InvalidReaction { reaction, reason } => {
                write!(f, "invalid reaction {reaction}: {reason}")
            }
            Self::MissingTemperature { temperature } => {
                write!(f, "no reaction set scored at {temperature} K")
            }
            Self::Json { reason } => write!(f, "catalog JSON error: {reason}"),
        }
    }
}

impl Error for CatalogError {}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            reason: e.to_string(),
        }
    }
}

impl From<CatalogError> for SimError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::UnknownPhase { phase } => SimError::UnknownPhase { phase },
            other => SimError::Config {
                reason: other.to_string(),
            },
        }
    }
}
