//! Simulation configuration, validation, and error types.
//!
//! [`SimulationConfig`] carries every knob a caller can turn.
//! [`validate()`](SimulationConfig::validate) checks it before any grid or
//! graph is built; the builders on it then assemble the reaction graph,
//! the calculator and the setup configuration.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use kiln_catalog::CatalogError;
use kiln_controller::ReactionCalculator;
use kiln_setup::{SetupConfig, VolumeTolerance};
use kiln_space::{CubicGrid, EdgeBehavior, LatticeGraph, Neighborhood, SpaceError};
use serde::{Deserialize, Serialize};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating configuration and schedules.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The lattice could not be built.
    Space(SpaceError),
    /// A catalog lookup or conversion failed.
    Catalog(CatalogError),
    /// Inertia is NaN, infinite or negative.
    InvalidInertia {
        /// The invalid value.
        value: f64,
    },
    /// Regrind threshold outside `[0, 1]`.
    InvalidThreshold {
        /// The invalid value.
        value: f64,
    },
    /// A tolerance is NaN, infinite or negative.
    InvalidTolerance {
        /// Which tolerance and why.
        reason: String,
    },
    /// An open species has a non-positive effective distance.
    InvalidOpenSpecies {
        /// The species.
        species: String,
        /// Its configured distance.
        distance: f64,
    },
    /// The schedule holds no stages.
    EmptySchedule,
    /// A schedule stage is malformed.
    InvalidStage {
        /// Index of the stage in the schedule.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },
    /// A sweep was requested between equal temperatures.
    DegenerateSweep {
        /// The shared start and end temperature.
        temperature: f64,
    },
    /// A recipe field is malformed.
    InvalidRecipe {
        /// What is wrong.
        reason: String,
    },
    /// JSON could not be parsed or written.
    Json {
        /// Parser message.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space(e) => write!(f, "space: {e}"),
            Self::Catalog(e) => write!(f, "catalog: {e}"),
            Self::InvalidInertia { value } => {
                write!(f, "inertia must be finite and >= 0, got {value}")
            }
            Self::InvalidThreshold { value } => {
                write!(f, "regrind_threshold must be in [0.0, 1.0], got {value}")
            }
            Self::InvalidTolerance { reason } => write!(f, "invalid tolerance: {reason}"),
            Self::InvalidOpenSpecies { species, distance } => write!(
                f,
                "open species '{species}' needs a finite positive distance, got {distance}"
            ),
            Self::EmptySchedule => write!(f, "heating schedule has no stages"),
            Self::InvalidStage { index, reason } => write!(f, "stage {index}: {reason}"),
            Self::DegenerateSweep { temperature } => write!(
                f,
                "sweep start and end temperatures are both {temperature}"
            ),
            Self::InvalidRecipe { reason } => write!(f, "invalid recipe: {reason}"),
            Self::Json { reason } => write!(f, "json: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Space(e) => Some(e),
            Self::Catalog(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpaceError> for ConfigError {
    fn from(e: SpaceError) -> Self {
        Self::Space(e)
    }
}

impl From<CatalogError> for ConfigError {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            reason: e.to_string(),
        }
    }
}

// ── SimulationConfig ───────────────────────────────────────────────

/// Every caller-facing knob of one simulation.
///
/// Missing fields take their defaults when deserialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Side length of the cubic grid. Default: 15.
    pub side: u32,
    /// Weight of interactions that do nothing. Default: 1.0.
    pub inertia: f64,
    /// Melted (or resolidified) volume fraction above which a stage
    /// transition regrinds the grid. Default: 0.15.
    pub regrind_threshold: f64,
    /// Relative tolerance of the per-phase volume check after a regrind.
    /// Default: 0.011.
    pub conservation_rtol: f64,
    /// Absolute volume tolerance of setup tuning. Default: 0.1.
    pub tuning_abs_tolerance: f64,
    /// Relative volume tolerance of setup tuning. Default: 0.005.
    pub tuning_rel_tolerance: f64,
    /// Tuning rounds before setup gives up. Default: 15.
    pub max_tuning_rounds: usize,
    /// Von Neumann radius of the reaction neighbourhood. Default: 5.
    pub reaction_radius: u32,
    /// Atmospheric species and their effective distances.
    pub open_species: IndexMap<String, f64>,
    /// Species that leave the grid when produced.
    pub free_species: Vec<String>,
    /// Base RNG seed; realization `i` uses `seed ^ i`. Default: 0.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            side: 15,
            inertia: 1.0,
            regrind_threshold: 0.15,
            conservation_rtol: 0.011,
            tuning_abs_tolerance: 0.1,
            tuning_rel_tolerance: 0.005,
            max_tuning_rounds: 15,
            reaction_radius: 5,
            open_species: IndexMap::new(),
            free_species: Vec::new(),
            seed: 0,
        }
    }
}

impl SimulationConfig {
    /// Validate all invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Grid must be constructible.
        CubicGrid::new(self.side, EdgeBehavior::Wrap)?;
        if self.reaction_radius == 0 {
            return Err(ConfigError::Space(SpaceError::InvalidRadius));
        }
        // 2. Inertia is a weight.
        if !self.inertia.is_finite() || self.inertia < 0.0 {
            return Err(ConfigError::InvalidInertia {
                value: self.inertia,
            });
        }
        // 3. Threshold is a fraction.
        if !(0.0..=1.0).contains(&self.regrind_threshold) {
            return Err(ConfigError::InvalidThreshold {
                value: self.regrind_threshold,
            });
        }
        // 4. Tolerances.
        for (name, value) in [
            ("conservation_rtol", self.conservation_rtol),
            ("tuning_abs_tolerance", self.tuning_abs_tolerance),
            ("tuning_rel_tolerance", self.tuning_rel_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTolerance {
                    reason: format!("{name} must be finite and >= 0, got {value}"),
                });
            }
        }
        // 5. Open species distances.
        if let Some((species, &distance)) = self
            .open_species
            .iter()
            .find(|(_, d)| !(d.is_finite() && **d > 0.0))
        {
            return Err(ConfigError::InvalidOpenSpecies {
                species: species.clone(),
                distance,
            });
        }
        Ok(())
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        (self.side as usize).pow(3)
    }

    /// Setup configuration derived from the tuning knobs.
    pub fn setup_config(&self) -> SetupConfig {
        SetupConfig {
            tolerance: VolumeTolerance {
                absolute: self.tuning_abs_tolerance,
                relative: self.tuning_rel_tolerance,
            },
            max_tuning_rounds: self.max_tuning_rounds,
            ..SetupConfig::default()
        }
    }

    /// Build the periodic reaction neighbourhood graph.
    pub fn reaction_graph(&self) -> Result<Arc<LatticeGraph>, ConfigError> {
        let grid = CubicGrid::new(self.side, EdgeBehavior::Wrap)?;
        let graph = LatticeGraph::build(
            &grid,
            Neighborhood::VonNeumann {
                radius: self.reaction_radius,
            },
        )?;
        Ok(Arc::new(graph))
    }

    /// Build a calculator over `graph` with this configuration's inertia,
    /// open species and free species, and no reaction set installed.
    pub fn calculator(&self, graph: Arc<LatticeGraph>) -> Result<ReactionCalculator, ConfigError> {
        let mut builder = ReactionCalculator::builder().graph(graph).inertia(self.inertia);
        for (species, distance) in &self.open_species {
            builder = builder.open_species(species.clone(), *distance);
        }
        for species in &self.free_species {
            builder = builder.free_species(species.clone());
        }
        builder
            .build()
            .map_err(|reason| ConfigError::InvalidRecipe { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_space::NeighborGraph;

    fn valid_config() -> SimulationConfig {
        SimulationConfig {
            side: 4,
            reaction_radius: 2,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn validate_valid_config_succeeds() {
        assert!(valid_config().validate().is_ok());
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_side_fails() {
        let mut cfg = valid_config();
        cfg.side = 0;
        match cfg.validate() {
            Err(ConfigError::Space(SpaceError::EmptySpace)) => {}
            other => panic!("expected Space(EmptySpace), got {other:?}"),
        }
    }

    #[test]
    fn validate_zero_radius_fails() {
        let mut cfg = valid_config();
        cfg.reaction_radius = 0;
        match cfg.validate() {
            Err(ConfigError::Space(SpaceError::InvalidRadius)) => {}
            other => panic!("expected Space(InvalidRadius), got {other:?}"),
        }
    }

    #[test]
    fn validate_negative_inertia_fails() {
        let mut cfg = valid_config();
        cfg.inertia = -0.5;
        match cfg.validate() {
            Err(ConfigError::InvalidInertia { .. }) => {}
            other => panic!("expected InvalidInertia, got {other:?}"),
        }
    }

    #[test]
    fn validate_threshold_out_of_range_fails() {
        for value in [-0.1, 1.5, f64::NAN] {
            let mut cfg = valid_config();
            cfg.regrind_threshold = value;
            match cfg.validate() {
                Err(ConfigError::InvalidThreshold { .. }) => {}
                other => panic!("expected InvalidThreshold, got {other:?}"),
            }
        }
    }

    #[test]
    fn validate_nan_tolerance_fails() {
        let mut cfg = valid_config();
        cfg.tuning_rel_tolerance = f64::NAN;
        match cfg.validate() {
            Err(ConfigError::InvalidTolerance { reason }) => {
                assert!(reason.contains("tuning_rel_tolerance"));
            }
            other => panic!("expected InvalidTolerance, got {other:?}"),
        }
    }

    #[test]
    fn validate_open_species_distance_fails() {
        let mut cfg = valid_config();
        cfg.open_species.insert("O2".into(), 0.0);
        match cfg.validate() {
            Err(ConfigError::InvalidOpenSpecies { species, .. }) => assert_eq!(species, "O2"),
            other => panic!("expected InvalidOpenSpecies, got {other:?}"),
        }
    }

    #[test]
    fn partial_json_takes_defaults() {
        let cfg: SimulationConfig = serde_json::from_str(r#"{"side": 6, "inertia": 0.1}"#).unwrap();
        assert_eq!(cfg.side, 6);
        assert_eq!(cfg.inertia, 0.1);
        assert_eq!(cfg.regrind_threshold, 0.15);
        assert_eq!(cfg.reaction_radius, 5);
    }

    #[test]
    fn builds_graph_and_calculator() {
        let mut cfg = valid_config();
        cfg.open_species.insert("O2".into(), 1.5);
        cfg.inertia = 0.3;
        let graph = cfg.reaction_graph().unwrap();
        assert_eq!(graph.site_count(), 64);
        let calc = cfg.calculator(graph).unwrap();
        assert_eq!(calc.inertia(), 0.3);
        assert!(calc.reactions().is_none());
        assert_eq!(cfg.setup_config().max_tuning_rounds, 15);
    }
}
