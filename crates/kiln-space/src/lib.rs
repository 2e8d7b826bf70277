//! Lattice topology for the Kiln reaction automaton.
//!
//! A [`CubicGrid`] numbers the cells of a periodic (or bounded) cube, and
//! a [`LatticeGraph`] precomputes, for every site, the neighbouring sites
//! within a [`Neighborhood`] stencil together with their Euclidean
//! distance. The automaton consumes the graph only through the
//! [`NeighborGraph`] trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compliance;
mod cubic;
mod edge;
mod error;
mod graph;

pub use cubic::{Coord3, CubicGrid};
pub use edge::EdgeBehavior;
pub use error::SpaceError;
pub use graph::{LatticeGraph, NeighborGraph, Neighborhood};
