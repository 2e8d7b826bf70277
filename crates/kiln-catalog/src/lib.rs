//! Phase and reaction catalogs for the Kiln reaction automaton.
//!
//! The automaton treats both catalogs as immutable, shared, read-only data
//! for the duration of a run:
//!
//! - [`PhaseSet`]: molar volume, melting point, density and gas
//!   classification per phase, plus mole/volume/element conversions.
//! - [`Reaction`]: volume-based stoichiometry with a competitiveness score.
//! - [`ReactionSet`]: reactions at one temperature, grouped by reactant set
//!   and ordered by descending competitiveness.
//! - [`ReactionLibrary`]: one [`ReactionSet`] per temperature.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod composition;
pub mod error;
pub mod library;
pub mod phase;
pub mod reaction;
pub mod reaction_set;

pub use composition::Composition;
pub use error::CatalogError;
pub use library::ReactionLibrary;
pub use phase::{MatterPhase, PhaseSet, PhaseSetBuilder, DEFAULT_GASES};
pub use reaction::Reaction;
pub use reaction_set::{ReactionSet, IDENTITY_STRENGTH};
