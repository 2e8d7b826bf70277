//! Error types for log persistence and indexing.

use std::fmt;
use std::io;

use kiln_core::SimError;

/// Errors that can occur while writing, reading or indexing a log.
#[derive(Debug)]
pub enum ReplayError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The document is not valid JSON for a log record.
    Json {
        /// Parser message.
        reason: String,
    },
    /// The JSON parsed but does not describe a valid log.
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A diff could not be applied while replaying.
    Sim(SimError),
    /// A checkpoint interval of zero was requested.
    InvalidInterval,
    /// The writer was used after [`finish`](crate::LogWriter::finish).
    Finished,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json { reason } => write!(f, "JSON error: {reason}"),
            Self::MalformedRecord { detail } => write!(f, "malformed log record: {detail}"),
            Self::Sim(e) => write!(f, "replay failed: {e}"),
            Self::InvalidInterval => write!(f, "checkpoint interval must be at least 1"),
            Self::Finished => write!(f, "log writer already finished"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Sim(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            reason: e.to_string(),
        }
    }
}

impl From<SimError> for ReplayError {
    fn from(e: SimError) -> Self {
        Self::Sim(e)
    }
}
