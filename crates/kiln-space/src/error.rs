//! Error types for lattice construction.

use std::fmt;

/// Errors arising from lattice or graph construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceError {
    /// Attempted to construct a lattice with zero cells.
    EmptySpace,
    /// The cell count does not fit the site id type.
    DimensionTooLarge {
        /// The requested side length.
        side: u32,
        /// Largest accepted side length.
        max: u32,
    },
    /// A neighbourhood stencil of radius zero was requested.
    InvalidRadius,
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySpace => write!(f, "space must have at least one cell"),
            Self::DimensionTooLarge { side, max } => {
                write!(f, "side length {side} exceeds maximum {max}")
            }
            Self::InvalidRadius => write!(f, "neighbourhood radius must be at least 1"),
        }
    }
}

impl std::error::Error for SpaceError {}
