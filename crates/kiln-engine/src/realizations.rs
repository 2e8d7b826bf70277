//! Independent realizations on a pool of scoped worker threads.
//!
//! Realization indices are handed out over a crossbeam channel; each
//! worker builds its own initial state, RNG and log, and sends the outcome
//! back over a second channel. Nothing mutable is shared between workers.
//! A realization that fails is logged and dropped; the rest are kept.

use std::num::NonZeroUsize;
use std::thread;

use kiln_core::{ResultLog, SimulationState};

use crate::heating::HeatingSchedule;
use crate::runner::{RunError, ScheduleRunner};

/// One finished realization.
#[derive(Clone, Debug, PartialEq)]
pub struct Realization {
    /// Position in the batch, from zero.
    pub index: usize,
    /// Seed the realization ran with: `base_seed ^ index`.
    pub seed: u64,
    /// The full trace.
    pub log: ResultLog,
}

/// Seed of realization `index` in a batch seeded with `base_seed`.
pub fn realization_seed(base_seed: u64, index: usize) -> u64 {
    base_seed ^ index as u64
}

/// Worker threads to use for `count` realizations: the machine's
/// available parallelism, capped at `count`.
pub fn default_workers(count: usize) -> usize {
    let cores = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    cores.min(count).max(1)
}

/// Run `count` realizations of `schedule` on `workers` threads.
///
/// `setup` builds the initial state of a realization from its seed.
/// Results come back ordered by index. Failed realizations (in setup or
/// during the run) are logged at `warn` and omitted.
pub fn run_realizations<F>(
    runner: &ScheduleRunner,
    schedule: &HeatingSchedule,
    count: usize,
    base_seed: u64,
    workers: usize,
    setup: F,
) -> Vec<Realization>
where
    F: Fn(u64) -> Result<SimulationState, RunError> + Sync,
{
    if count == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, count);
    let (task_tx, task_rx) = crossbeam_channel::unbounded::<usize>();
    for index in 0..count {
        // The receiver is alive, so an unbounded send cannot fail.
        let _ = task_tx.send(index);
    }
    drop(task_tx);
    let (result_tx, result_rx) = crossbeam_channel::bounded(workers);

    log::info!("running {count} realizations on {workers} workers");
    let mut done = Vec::with_capacity(count);
    thread::scope(|scope| {
        for _ in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let setup = &setup;
            scope.spawn(move || {
                while let Ok(index) = task_rx.recv() {
                    let seed = realization_seed(base_seed, index);
                    let outcome = setup(seed).and_then(|initial| runner.run(initial, schedule, seed));
                    if result_tx.send((index, seed, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        for (index, seed, outcome) in result_rx.iter() {
            match outcome {
                Ok(log) => {
                    log::debug!("realization {index} finished with {} steps", log.len());
                    done.push(Realization { index, seed, log });
                }
                Err(e) => log::warn!("realization {index} (seed {seed}) failed: {e}"),
            }
        }
    });

    done.sort_by_key(|r| r.index);
    log::info!("{} of {count} realizations succeeded", done.len());
    done
}
