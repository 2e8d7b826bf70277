//! Site controllers and the step scheduler for Kiln.
//!
//! A [`SiteController`] picks a site and proposes a [`StateDiff`] for it;
//! the [`StepRunner`] applies those diffs one tick at a time, so every
//! proposal observes the effects of all earlier ticks. The
//! [`ReactionCalculator`] implements the stochastic local reaction rule
//! and [`ReactionController`] binds it to the scheduler with a hot-swappable
//! reaction catalog.
//!
//! [`StateDiff`]: kiln_core::StateDiff

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod calculator;
pub mod controller;
pub mod reaction_controller;
pub mod scheduler;

pub use calculator::{Interaction, InteractionKind, ReactionCalculator, ReactionCalculatorBuilder};
pub use controller::SiteController;
pub use reaction_controller::ReactionController;
pub use scheduler::StepRunner;
