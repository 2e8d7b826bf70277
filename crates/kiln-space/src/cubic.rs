//! Simple cubic lattice with `side³` cells.

use crate::edge::{resolve_axis, EdgeBehavior};
use crate::error::SpaceError;
use kiln_core::SiteId;

/// Cell coordinate `[x, y, z]`.
pub type Coord3 = [i32; 3];

/// A cube of `side × side × side` cells.
///
/// Sites are numbered x-fastest: `id = x + side * (y + side * z)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CubicGrid {
    side: u32,
    edge: EdgeBehavior,
}

impl CubicGrid {
    /// Largest side length whose cell count fits a `u32` site id.
    pub const MAX_SIDE: u32 = 1625;

    /// Create a cube with the given side length and edge behavior.
    ///
    /// # Examples
    ///
    /// ```
    /// use kiln_space::{CubicGrid, EdgeBehavior};
    ///
    /// let grid = CubicGrid::new(10, EdgeBehavior::Wrap).unwrap();
    /// assert_eq!(grid.cell_count(), 1000);
    /// assert!(CubicGrid::new(0, EdgeBehavior::Wrap).is_err());
    /// ```
    pub fn new(side: u32, edge: EdgeBehavior) -> Result<Self, SpaceError> {
        if side == 0 {
            return Err(SpaceError::EmptySpace);
        }
        if side > Self::MAX_SIDE {
            return Err(SpaceError::DimensionTooLarge {
                side,
                max: Self::MAX_SIDE,
            });
        }
        Ok(Self { side, edge })
    }

    /// Side length.
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Edge behavior.
    pub fn edge_behavior(&self) -> EdgeBehavior {
        self.edge
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        (self.side as usize).pow(3)
    }

    /// Coordinate of a site. The id must be in range.
    pub fn coord(&self, site: SiteId) -> Coord3 {
        let s = self.side;
        let id = site.0;
        [(id % s) as i32, ((id / s) % s) as i32, (id / (s * s)) as i32]
    }

    /// Site at `coord`, resolving out-of-range axes per the edge behavior.
    pub fn site_at(&self, coord: Coord3) -> Option<SiteId> {
        let x = resolve_axis(coord[0], self.side, self.edge)?;
        let y = resolve_axis(coord[1], self.side, self.edge)?;
        let z = resolve_axis(coord[2], self.side, self.edge)?;
        let s = self.side;
        Some(SiteId(x as u32 + s * (y as u32 + s * z as u32)))
    }

    /// All site ids in canonical order.
    pub fn sites(&self) -> impl Iterator<Item = SiteId> {
        (0..self.cell_count() as u32).map(SiteId)
    }
}
