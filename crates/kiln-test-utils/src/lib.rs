//! Test utilities and fixture catalogs for Kiln development.
//!
//! Provides a hand-wired [`MockGraph`] implementing [`NeighborGraph`],
//! helpers for building small grids and lattice graphs, and the fixture
//! chemical systems in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::Arc;

use kiln_core::{GeneralState, SimulationState, SiteId, SiteState};
use kiln_space::{CubicGrid, EdgeBehavior, LatticeGraph, NeighborGraph, Neighborhood};

/// Neighbour graph with explicitly listed edges.
///
/// Edges added with [`connect`](MockGraph::connect) are symmetric.
pub struct MockGraph {
    rows: Vec<Vec<(SiteId, f64)>>,
}

impl MockGraph {
    pub fn new(site_count: usize) -> Self {
        Self {
            rows: vec![Vec::new(); site_count],
        }
    }

    /// Connect `a` and `b` at `distance` in both directions.
    pub fn connect(mut self, a: u32, b: u32, distance: f64) -> Self {
        self.rows[a as usize].push((SiteId(b), distance));
        self.rows[b as usize].push((SiteId(a), distance));
        self
    }

    /// A ring of `n` sites, each adjacent to its two neighbours at unit
    /// distance.
    pub fn ring(n: u32) -> Self {
        (0..n).fold(Self::new(n as usize), |g, i| g.connect(i, (i + 1) % n, 1.0))
    }
}

impl NeighborGraph for MockGraph {
    fn site_count(&self) -> usize {
        self.rows.len()
    }

    fn neighbors(&self, site: SiteId) -> &[(SiteId, f64)] {
        self.rows.get(site.index()).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A state whose sites hold the given `(phase, volume)` pairs.
pub fn grid_of(sites: &[(&str, f64)]) -> SimulationState {
    SimulationState::new(
        sites.iter().map(|(p, v)| SiteState::new(*p, *v)).collect(),
        GeneralState::default(),
    )
}

/// A periodic cube of the given side.
pub fn periodic_cube(side: u32) -> CubicGrid {
    CubicGrid::new(side, EdgeBehavior::Wrap).expect("side must be positive")
}

/// Periodic von Neumann graph of the given side and radius.
pub fn von_neumann_graph(side: u32, radius: u32) -> Arc<LatticeGraph> {
    Arc::new(
        LatticeGraph::build(&periodic_cube(side), Neighborhood::VonNeumann { radius })
            .expect("radius must be positive"),
    )
}

/// Periodic Moore graph of the given side and radius.
pub fn moore_graph(side: u32, radius: u32) -> Arc<LatticeGraph> {
    Arc::new(
        LatticeGraph::build(&periodic_cube(side), Neighborhood::Moore { radius })
            .expect("radius must be positive"),
    )
}

/// Assert two floats agree within a relative tolerance.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64, rtol: f64) {
    let scale = expected.abs().max(1e-12);
    assert!(
        (actual - expected).abs() / scale <= rtol,
        "expected {expected}, got {actual} (rtol {rtol})"
    );
}
