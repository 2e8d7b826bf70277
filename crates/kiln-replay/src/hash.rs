//! Hashing utilities for comparing realizations.
//!
//! Uses FNV-1a for fast, deterministic hashing of simulation state.
//! These hashes are not cryptographically secure; they are used for
//! fast equality checks between runs.

use kiln_core::{PhaseVolumes, ResultLog, SimulationState};

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = (hash ^ b as u64).wrapping_mul(FNV_PRIME);
    }
    hash
}

#[inline]
fn fnv1a_f64(hash: u64, v: f64) -> u64 {
    fnv1a_bytes(hash, &v.to_bits().to_le_bytes())
}

fn fnv1a_str(hash: u64, s: &str) -> u64 {
    // Length prefix keeps "AB"+"C" distinct from "A"+"BC".
    let hash = fnv1a_bytes(hash, &(s.len() as u64).to_le_bytes());
    fnv1a_bytes(hash, s.as_bytes())
}

fn fnv1a_ledger(mut hash: u64, ledger: &PhaseVolumes) -> u64 {
    hash = fnv1a_bytes(hash, &(ledger.len() as u64).to_le_bytes());
    for (phase, v) in ledger {
        hash = fnv1a_str(hash, phase);
        hash = fnv1a_f64(hash, *v);
    }
    hash
}

/// Hash every site and every general field of `state`.
///
/// Volumes are hashed by bit pattern, so `0.0` and `-0.0` differ. Ledger
/// entries are hashed in map order.
pub fn state_hash(state: &SimulationState) -> u64 {
    let mut hash = FNV_OFFSET;
    for site in &state.sites {
        hash = fnv1a_str(hash, &site.phase);
        hash = fnv1a_f64(hash, site.volume);
    }
    let g = &state.general;
    hash = fnv1a_f64(hash, g.temperature);
    hash = fnv1a_f64(hash, g.vol_multiplier);
    hash = fnv1a_ledger(hash, &g.gases_evolved);
    hash = fnv1a_ledger(hash, &g.gases_consumed);
    fnv1a_ledger(hash, &g.melted_volumes)
}

/// First step at which two logs hold different states.
///
/// Returns `None` when the logs are identical step for step. If one log is
/// a prefix of the other, the first step past the shorter one is returned.
pub fn first_divergence(a: &ResultLog, b: &ResultLog) -> Option<usize> {
    let mut sa = a.initial_state().clone();
    let mut sb = b.initial_state().clone();
    if state_hash(&sa) != state_hash(&sb) {
        return Some(0);
    }
    for (step, (da, db)) in a.diffs().iter().zip(b.diffs()).enumerate() {
        // Both logs validated every diff on push.
        if sa.apply(da).is_err() || sb.apply(db).is_err() || state_hash(&sa) != state_hash(&sb) {
            return Some(step + 1);
        }
    }
    (a.len() != b.len()).then(|| a.len().min(b.len()) + 1)
}
