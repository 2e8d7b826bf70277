//! Neighbour graph compliance test helpers.
//!
//! These functions verify that a [`NeighborGraph`] implementation
//! satisfies the invariants the automaton relies on. Reused by unit
//! tests, integration tests and downstream crates that supply their own
//! graphs.

use crate::graph::NeighborGraph;
use kiln_core::SiteId;

fn all_sites(graph: &dyn NeighborGraph) -> impl Iterator<Item = SiteId> {
    (0..graph.site_count() as u32).map(SiteId)
}

/// Assert that no site lists itself as a neighbour.
pub fn assert_no_self_loops(graph: &dyn NeighborGraph) {
    for site in all_sites(graph) {
        assert!(
            graph.neighbors(site).iter().all(|(nb, _)| *nb != site),
            "site {site} lists itself as a neighbour"
        );
    }
}

/// Assert that `b in neighbors(a)` implies `a in neighbors(b)` with the
/// same distance.
pub fn assert_neighbours_symmetric(graph: &dyn NeighborGraph) {
    for a in all_sites(graph) {
        for (b, d_ab) in graph.neighbors(a) {
            let back = graph.neighbors(*b).iter().find(|(x, _)| *x == a);
            match back {
                Some((_, d_ba)) => assert!(
                    (d_ab - d_ba).abs() < 1e-12,
                    "distance {a}->{b} = {d_ab} but {b}->{a} = {d_ba}"
                ),
                None => panic!("{b} is a neighbour of {a} but not vice versa"),
            }
        }
    }
}

/// Assert that every neighbour distance is finite and positive.
pub fn assert_positive_distances(graph: &dyn NeighborGraph) {
    for a in all_sites(graph) {
        for (b, d) in graph.neighbors(a) {
            assert!(
                d.is_finite() && *d > 0.0,
                "distance {a}->{b} = {d} is not positive"
            );
        }
    }
}
