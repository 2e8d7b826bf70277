//! Heating schedules and realization drivers for Kiln.
//!
//! A [`ScheduleRunner`] takes a prepared grid through a
//! [`HeatingSchedule`]: each heat stage swaps in the reaction set scored
//! at its temperature and runs the reaction controller for a whole number
//! of sweeps, and each stage boundary passes the grid through
//! [`MeltRegrind`] so that liquid material leaves the grid and resolidified
//! material returns to it. [`ReactionRecipe`] bundles a schedule, a
//! precursor mixture and a [`SimulationConfig`], and [`run_single`] /
//! [`run_parallel`] drive one or many independent realizations of it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod heating;
pub mod realizations;
pub mod recipe;
pub mod regrind;
pub mod runner;

pub use config::{ConfigError, SimulationConfig};
pub use heating::{HeatingSchedule, HeatingStage};
pub use realizations::{default_workers, realization_seed, run_realizations, Realization};
pub use recipe::{run_parallel, run_single, ReactionRecipe};
pub use regrind::MeltRegrind;
pub use runner::{RunError, ScheduleRunner};
