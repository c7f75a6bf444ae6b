//! Derivation of explicit, per-trial random seeds.
use sha2::{Digest, Sha256};

use crate::core::key::Index;

/// The seed of a trial, derived from the base seed of the sweep, the key of the job and the trial number.
///
/// Distinct (key, trial) pairs get unrelated seeds, so no two trials of a sweep replay the same random stream.
pub fn derive_seed(base_seed: u64, key: &Index, trial: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(key.to_bytes());
    hasher.update((trial as u64).to_le_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(bytes)
}
