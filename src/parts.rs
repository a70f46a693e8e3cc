//! Deterministic sharding of work across independent jobs.
//!
//! An item belongs to part `p` of `n` when its hash modulo `n` is `p`. The
//! hash is stable across runs and machines with the same pointer width, so
//! separate processes agree on the split without talking to each other.
//! Parts are 0-based here; the command line takes 1-based part numbers.

use crate::error::{KmrError, Result};
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Check that `part` is a valid 0-based index into `nparts` parts.
pub fn check_part(part: usize, nparts: usize) -> Result<()> {
    if nparts == 0 {
        return Err(KmrError::InvalidInput(
            "number of parts must be positive".to_string(),
        ));
    }
    if part >= nparts {
        return Err(KmrError::InvalidInput(format!(
            "part {} is out of range for {} parts",
            part + 1,
            nparts
        )));
    }
    Ok(())
}

/// Stable 64-bit hash of a byte string.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut h = FxHasher::default();
    h.write(bytes);
    h.finish()
}

/// Whether `bytes` falls in the given part.
#[inline]
pub fn in_part(bytes: &[u8], part: usize, nparts: usize) -> bool {
    nparts <= 1 || hash_bytes(bytes) % nparts as u64 == part as u64
}

/// The items that fall in `part`, with their positions in `items`.
pub fn choose_part<S: AsRef<str>>(
    items: &[S],
    part: usize,
    nparts: usize,
) -> Result<(Vec<&S>, Vec<usize>)> {
    check_part(part, nparts)?;
    let mut chosen = Vec::new();
    let mut indices = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if in_part(item.as_ref().as_bytes(), part, nparts) {
            chosen.push(item);
            indices.push(i);
        }
    }
    Ok((chosen, indices))
}
