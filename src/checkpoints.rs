//! Key-space checkpoints for splitting a merge into bounded-memory passes.
//!
//! `checkpoints(n)` returns `n` keys that cut the key space into buckets of
//! roughly equal probability under random canonical k-mers. Pass `i` handles
//! the keys in `(checkpoint[i-1], checkpoint[i]]`. The last checkpoint is
//! [`Kmer::MAX`], so every key lands in some bucket.
//!
//! The split is approximate: it is estimated from `n * MULTIPLIER` random
//! samples, so per-bucket sizes vary from run to run.

use crate::kmer::{canonicalize, Kmer, KMER_LEN};
use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Random samples drawn per checkpoint.
pub const MULTIPLIER: usize = 100;

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// `n` checkpoints from a freshly seeded generator.
pub fn checkpoints(n: usize) -> Vec<Kmer> {
    checkpoints_with_rng(n, &mut SmallRng::from_entropy())
}

/// `n` checkpoints from a fixed seed. Same seed, same checkpoints.
pub fn checkpoints_seeded(n: usize, seed: u64) -> Vec<Kmer> {
    checkpoints_with_rng(n, &mut SmallRng::seed_from_u64(seed))
}

/// `n` checkpoints drawing randomness from `rng`.
///
/// The result is sorted and its last element is [`Kmer::MAX`].
pub fn checkpoints_with_rng<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Kmer> {
    if n == 0 {
        return Vec::new();
    }

    let mut samples = Vec::with_capacity(n * MULTIPLIER);
    let mut seq = Vec::with_capacity(KMER_LEN);
    let mut scratch = Vec::with_capacity(KMER_LEN);
    for _ in 0..n * MULTIPLIER {
        seq.clear();
        seq.extend((0..KMER_LEN).map(|_| BASES[rng.gen_range(0..4)]));
        canonicalize(&mut seq, &mut scratch);
        // Only ACGT goes in, so packing cannot fail.
        if let Ok(kmer) = Kmer::from_dna(&seq) {
            samples.push(kmer);
        }
    }
    samples.sort_unstable();

    let mut result: Vec<Kmer> = (1..n).map(|i| samples[i * MULTIPLIER]).collect();
    result.push(Kmer::MAX);
    debug!("Drew {} checkpoints from {} samples", n, samples.len());
    result
}

/// Index of the bucket `kmer` belongs to: the first checkpoint that is
/// greater than or equal to it.
///
/// Returns `checkpoints.len()` if every checkpoint is smaller, which cannot
/// happen when the last checkpoint is [`Kmer::MAX`].
#[inline]
pub fn bucket_of(kmer: &Kmer, checkpoints: &[Kmer]) -> usize {
    checkpoints.partition_point(|c| c < kmer)
}
