//! Fixed-width 2-bit packed k-mer keys.
//!
//! A k-mer of [`KMER_LEN`] bases is stored *neutralized*: the middle base (the
//! variant position) is dropped and the remaining 32 bases are packed 2 bits
//! each, first base in the high bits of the first byte. With that layout the
//! derived byte-wise ordering of [`Kmer`] is exactly the lexicographic order of
//! the underlying DNA (A < C < G < T).

use crate::error::{KmrError, Result};
use std::fmt;

/// Length of a full k-mer in bases, including the variant position.
pub const KMER_LEN: usize = 33;

/// Index of the variant position inside a full k-mer.
pub const SNP_POS: usize = KMER_LEN / 2;

/// Number of bases stored in a neutralized key.
pub const KEY_BASES: usize = KMER_LEN - 1;

/// Width of a packed key in bytes.
pub const KMER_BYTES: usize = KEY_BASES.div_ceil(4);

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// 2-bit code of a nucleotide, or `None` for anything else.
#[inline]
pub fn base_to_bits(b: u8) -> Option<u8> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Reverse complement of an upper-case DNA sequence into `out`.
pub fn reverse_complement(seq: &[u8], out: &mut Vec<u8>) {
    out.clear();
    out.extend(seq.iter().rev().map(|&b| match b {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        other => other,
    }));
}

/// Replace `seq` with its reverse complement if that compares smaller.
pub fn canonicalize(seq: &mut Vec<u8>, scratch: &mut Vec<u8>) {
    reverse_complement(seq, scratch);
    if scratch.as_slice() < seq.as_slice() {
        std::mem::swap(seq, scratch);
    }
}

/// A neutralized, 2-bit packed k-mer.
///
/// Immutable value type; equality and ordering are byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Kmer(pub [u8; KMER_BYTES]);

impl Kmer {
    /// The smallest key (all `A`).
    pub const MIN: Kmer = Kmer([0; KMER_BYTES]);

    /// The largest key: every bit set.
    pub const MAX: Kmer = Kmer([0xff; KMER_BYTES]);

    /// Wrap raw packed bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; KMER_BYTES]) -> Self {
        Kmer(bytes)
    }

    /// Raw packed bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; KMER_BYTES] {
        &self.0
    }

    /// Pack exactly [`KEY_BASES`] bases (no variant position).
    pub fn from_bases(bases: &[u8]) -> Result<Self> {
        if bases.len() != KEY_BASES {
            return Err(KmrError::InvalidInput(format!(
                "expected {} bases, got {}",
                KEY_BASES,
                bases.len()
            )));
        }
        let mut out = [0u8; KMER_BYTES];
        for (i, &b) in bases.iter().enumerate() {
            let bits = base_to_bits(b).ok_or_else(|| {
                KmrError::InvalidInput(format!("invalid base {:?} in k-mer", b as char))
            })?;
            out[i / 4] |= bits << (6 - 2 * (i % 4));
        }
        Ok(Kmer(out))
    }

    /// Pack a full [`KMER_LEN`]-base k-mer, skipping its variant position.
    pub fn from_dna(seq: &[u8]) -> Result<Self> {
        if seq.len() != KMER_LEN {
            return Err(KmrError::InvalidInput(format!(
                "expected a {}-mer, got {} bases",
                KMER_LEN,
                seq.len()
            )));
        }
        let mut bases = [0u8; KEY_BASES];
        bases[..SNP_POS].copy_from_slice(&seq[..SNP_POS]);
        bases[SNP_POS..].copy_from_slice(&seq[SNP_POS + 1..]);
        Self::from_bases(&bases)
    }

    /// The stored [`KEY_BASES`] bases.
    pub fn bases(&self) -> [u8; KEY_BASES] {
        let mut out = [0u8; KEY_BASES];
        for (i, b) in out.iter_mut().enumerate() {
            let bits = (self.0[i / 4] >> (6 - 2 * (i % 4))) & 3;
            *b = BASES[bits as usize];
        }
        out
    }

    /// Expand to a full k-mer with `A` at the variant position.
    pub fn to_dna(&self) -> Vec<u8> {
        let bases = self.bases();
        let mut out = Vec::with_capacity(KMER_LEN);
        out.extend_from_slice(&bases[..SNP_POS]);
        out.push(b'A');
        out.extend_from_slice(&bases[SNP_POS..]);
        out
    }

    /// Length of the common prefix of two keys, in bytes.
    #[inline]
    pub fn common_prefix(&self, other: &Kmer) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }
}

impl fmt::Display for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bases = self.bases();
        // Only A/C/G/T are ever produced.
        f.write_str(std::str::from_utf8(&bases).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kmer({})", self)
    }
}
