//! Precomputed neighbourhood graphs.

use crate::cubic::CubicGrid;
use crate::error::SpaceError;
use kiln_core::SiteId;
use smallvec::SmallVec;

/// Read-only neighbour lookup consumed by the automaton.
///
/// Each neighbour carries a distance weight: the Euclidean length of the
/// stencil offset that reached it.
pub trait NeighborGraph: Send + Sync {
    /// Number of sites in the graph.
    fn site_count(&self) -> usize;

    /// Neighbours of `site` with their distances. Empty for an unknown
    /// site. Never contains `site` itself.
    fn neighbors(&self, site: SiteId) -> &[(SiteId, f64)];
}

/// Stencil shape used to build a [`LatticeGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Neighborhood {
    /// All offsets with Chebyshev length at most `radius`.
    Moore {
        /// Stencil radius.
        radius: u32,
    },
    /// All offsets with Manhattan length at most `radius`.
    VonNeumann {
        /// Stencil radius.
        radius: u32,
    },
}

impl Neighborhood {
    fn radius(self) -> u32 {
        match self {
            Self::Moore { radius } | Self::VonNeumann { radius } => radius,
        }
    }

    /// Non-zero stencil offsets with their Euclidean lengths.
    pub fn offsets(self) -> Vec<([i32; 3], f64)> {
        let r = self.radius() as i32;
        let mut out = Vec::new();
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let inside = match self {
                        Self::Moore { .. } => true,
                        Self::VonNeumann { .. } => dx.abs() + dy.abs() + dz.abs() <= r,
                    };
                    if inside {
                        let d = ((dx * dx + dy * dy + dz * dz) as f64).sqrt();
                        out.push(([dx, dy, dz], d));
                    }
                }
            }
        }
        out
    }
}

/// Compressed-row neighbour lists for every site of a [`CubicGrid`].
///
/// When several offsets land on the same cell (small periodic grids, or
/// clamped faces) the shortest distance is kept.
#[derive(Clone, Debug)]
pub struct LatticeGraph {
    row_starts: Vec<usize>,
    entries: Vec<(SiteId, f64)>,
}

impl LatticeGraph {
    /// Build the graph for `grid` under `neighborhood`.
    pub fn build(grid: &CubicGrid, neighborhood: Neighborhood) -> Result<Self, SpaceError> {
        if neighborhood.radius() == 0 {
            return Err(SpaceError::InvalidRadius);
        }
        let offsets = neighborhood.offsets();
        let mut row_starts = Vec::with_capacity(grid.cell_count() + 1);
        let mut entries = Vec::with_capacity(grid.cell_count() * offsets.len());
        let mut row: SmallVec<[(SiteId, f64); 32]> = SmallVec::new();

        for site in grid.sites() {
            row.clear();
            let [x, y, z] = grid.coord(site);
            for ([dx, dy, dz], d) in &offsets {
                let Some(nb) = grid.site_at([x + dx, y + dy, z + dz]) else {
                    continue;
                };
                if nb == site {
                    continue;
                }
                match row.iter_mut().find(|(id, _)| *id == nb) {
                    Some(existing) => existing.1 = existing.1.min(*d),
                    None => row.push((nb, *d)),
                }
            }
            row_starts.push(entries.len());
            entries.extend_from_slice(&row);
        }
        row_starts.push(entries.len());
        Ok(Self {
            row_starts,
            entries,
        })
    }

    /// Total number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.entries.len()
    }
}

impl NeighborGraph for LatticeGraph {
    fn site_count(&self) -> usize {
        self.row_starts.len() - 1
    }

    fn neighbors(&self, site: SiteId) -> &[(SiteId, f64)] {
        let i = site.index();
        if i + 1 >= self.row_starts.len() {
            return &[];
        }
        &self.entries[self.row_starts[i]..self.row_starts[i + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance;
    use crate::edge::EdgeBehavior;

    fn graph(side: u32, edge: EdgeBehavior, nb: Neighborhood) -> LatticeGraph {
        LatticeGraph::build(&CubicGrid::new(side, edge).unwrap(), nb).unwrap()
    }

    #[test]
    fn stencil_sizes() {
        assert_eq!(Neighborhood::Moore { radius: 1 }.offsets().len(), 26);
        assert_eq!(Neighborhood::VonNeumann { radius: 1 }.offsets().len(), 6);
        assert_eq!(Neighborhood::VonNeumann { radius: 2 }.offsets().len(), 24);
    }

    #[test]
    fn zero_radius_rejected() {
        let g = CubicGrid::new(3, EdgeBehavior::Wrap).unwrap();
        assert_eq!(
            LatticeGraph::build(&g, Neighborhood::Moore { radius: 0 }).unwrap_err(),
            SpaceError::InvalidRadius
        );
    }

    #[test]
    fn face_neighbours_have_unit_distance() {
        let g = graph(5, EdgeBehavior::Wrap, Neighborhood::VonNeumann { radius: 1 });
        for (_, d) in g.neighbors(SiteId(62)) {
            assert!((d - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn small_wrap_grid_deduplicates() {
        // On a 2-cube every +1 and -1 offset reaches the same cell.
        let g = graph(2, EdgeBehavior::Wrap, Neighborhood::VonNeumann { radius: 1 });
        assert_eq!(g.neighbors(SiteId(0)).len(), 3);
        let g = graph(2, EdgeBehavior::Wrap, Neighborhood::Moore { radius: 1 });
        assert_eq!(g.neighbors(SiteId(0)).len(), 7);
    }

    #[test]
    fn diagonal_distances_kept_minimal() {
        let g = graph(3, EdgeBehavior::Wrap, Neighborhood::Moore { radius: 1 });
        let corner_offset = g
            .neighbors(SiteId(0))
            .iter()
            .map(|(_, d)| *d)
            .fold(0.0f64, f64::max);
        assert!((corner_offset - 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn unknown_site_has_no_neighbours() {
        let g = graph(2, EdgeBehavior::Absorb, Neighborhood::Moore { radius: 1 });
        assert!(g.neighbors(SiteId(100)).is_empty());
    }

    #[test]
    fn compliance_wrap_and_absorb() {
        for edge in [EdgeBehavior::Wrap, EdgeBehavior::Absorb] {
            for nb in [
                Neighborhood::Moore { radius: 1 },
                Neighborhood::VonNeumann { radius: 2 },
            ] {
                let g = graph(4, edge, nb);
                compliance::assert_no_self_loops(&g);
                compliance::assert_neighbours_symmetric(&g);
                compliance::assert_positive_distances(&g);
            }
        }
    }
}
