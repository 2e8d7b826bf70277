//! Spatial edge (boundary) behavior for the cubic lattice.

/// How the lattice handles stencil offsets that leave the cube.
///
/// # Examples
///
/// ```
/// use kiln_space::{CubicGrid, EdgeBehavior, LatticeGraph, Neighborhood, NeighborGraph};
/// use kiln_core::SiteId;
///
/// let moore = Neighborhood::Moore { radius: 1 };
///
/// // Absorb: a corner of a 4x4x4 cube has 7 neighbours, the interior 26.
/// let absorb = CubicGrid::new(4, EdgeBehavior::Absorb).unwrap();
/// let g = LatticeGraph::build(&absorb, moore).unwrap();
/// assert_eq!(g.neighbors(SiteId(0)).len(), 7);
///
/// // Wrap: every cell has all 26 neighbours (3-torus).
/// let wrap = CubicGrid::new(4, EdgeBehavior::Wrap).unwrap();
/// let g = LatticeGraph::build(&wrap, moore).unwrap();
/// assert_eq!(g.neighbors(SiteId(0)).len(), 26);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EdgeBehavior {
    /// Out-of-bounds offset maps to the boundary cell.
    Clamp,
    /// Out-of-bounds offset wraps to the opposite face (periodic).
    #[default]
    Wrap,
    /// Out-of-bounds offset is omitted (fewer neighbours at faces).
    Absorb,
}

/// Resolve a single-axis coordinate against `len` under `edge`.
pub(crate) fn resolve_axis(val: i32, len: u32, edge: EdgeBehavior) -> Option<i32> {
    let n = len as i32;
    if val >= 0 && val < n {
        return Some(val);
    }
    match edge {
        EdgeBehavior::Absorb => None,
        EdgeBehavior::Clamp => Some(val.clamp(0, n - 1)),
        EdgeBehavior::Wrap => Some(((val % n) + n) % n),
    }
}
