//! Result-log persistence and random access for Kiln.
//!
//! A [`ResultLog`](kiln_core::ResultLog) is an initial state plus one diff
//! per step. This crate stores it as a single JSON document and indexes it
//! for fast lookup of intermediate states.
//!
//! # Architecture
//!
//! - [`LogWriter`] streams a log to any `Write` sink, one diff at a time
//! - [`read_log`] parses and validates a log from any `Read` source
//! - [`StateIndex`] keeps full checkpoints every `k` steps so any state is
//!   at most `k - 1` diffs away
//! - [`state_hash`] and [`first_divergence`] compare realizations
//!
//! # Format
//!
//! ```text
//! {"initial_state": {"sites": {"0": {"phase": "A", "volume": 1.0}, ...},
//!                    "general": {...}},
//!  "diffs": [{"sites": {"4": {...}}, "general": {"temperature": 900.0}}, ...]}
//! ```
//!
//! Site ids are decimal strings. Diff `general` entries list only the
//! fields that change.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod hash;
pub mod index;
pub mod reader;
pub mod records;
pub mod writer;

pub use error::ReplayError;
pub use hash::{first_divergence, state_hash};
pub use index::StateIndex;
pub use reader::{read_log, read_record};
pub use records::{DiffRecord, GeneralDiffRecord, GeneralRecord, LogRecord, SiteRecord, StateRecord};
pub use writer::{write_log, LogWriter};
