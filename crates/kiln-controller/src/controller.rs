//! The [`SiteController`] trait.

use kiln_core::{SimError, SimulationState, SiteId, StateDiff};
use rand::{Rng, RngCore};

/// A local update rule driven one site at a time by the step scheduler.
///
/// # Contract
///
/// - `propose_update()` must not mutate `state`; all changes are returned
///   as a diff and applied by the scheduler before the next tick.
/// - Randomness comes only from the supplied RNG, so a seeded scheduler
///   reproduces the same trajectory.
///
/// # Object safety
///
/// This trait is object-safe; schedulers accept `&mut dyn SiteController`.
///
/// # Examples
///
/// A controller that fills every free cell it visits:
///
/// ```
/// use kiln_controller::SiteController;
/// use kiln_core::{SimError, SimulationState, SiteId, SiteState, StateDiff};
/// use rand::RngCore;
///
/// struct Fill;
///
/// impl SiteController for Fill {
///     fn name(&self) -> &str { "fill" }
///
///     fn propose_update(
///         &mut self,
///         site: SiteId,
///         state: &SimulationState,
///         _rng: &mut dyn RngCore,
///     ) -> Result<StateDiff, SimError> {
///         let mut diff = StateDiff::empty();
///         if state.try_site(site)?.is_free() {
///             diff.set_site(site, SiteState::new("A", 1.0));
///         }
///         Ok(diff)
///     }
/// }
///
/// assert_eq!(Fill.name(), "fill");
/// ```
pub trait SiteController: Send {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Choose the next site to update. Defaults to a uniform draw over all
    /// sites; `None` stops the current run early.
    fn select_site(&mut self, state: &SimulationState, rng: &mut dyn RngCore) -> Option<SiteId> {
        let n = state.site_count();
        if n == 0 {
            return None;
        }
        Some(SiteId(rng.gen_range(0..n) as u32))
    }

    /// Propose the diff for `site` given the current state.
    fn propose_update(
        &mut self,
        site: SiteId,
        state: &SimulationState,
        rng: &mut dyn RngCore,
    ) -> Result<StateDiff, SimError>;
}
