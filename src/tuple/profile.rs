//! Profile payload: base-call histograms around a k-mer.
//!
//! A profile counts, for every position in a window of
//! `MAX_READ_LEN` bases on either side of the k-mer, how often each
//! nucleotide was observed in reads containing it. The companion counter
//! records in how many samples each position was covered at all.

use super::{DataHandler, Tuple};
use crate::error::{KmrError, Result};
use crate::kmer::{base_to_bits, KMER_LEN};
use crate::varint::{expect_len, expect_uvarint, write_uvarint};
use std::io::{BufRead, Write};

/// Longest read that can be folded into a profile.
pub const MAX_READ_LEN: usize = 100;

/// Number of positions tracked by a profile.
pub const PROFILE_LEN: usize = MAX_READ_LEN * 2 + KMER_LEN;

/// Base counts per position plus per-position sample presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileData {
    /// `p[pos][base]`, bases in A, C, G, T order.
    pub p: Vec<[u64; 4]>,
    /// Number of samples covering each position.
    pub c: Vec<u64>,
}

impl Default for ProfileData {
    fn default() -> Self {
        Self {
            p: vec![[0; 4]; PROFILE_LEN],
            c: vec![0; PROFILE_LEN],
        }
    }
}

impl ProfileData {
    /// Count the bases of a read in which the k-mer starts at `kmer_pos`.
    ///
    /// `N` calls are skipped.
    pub fn fill(&mut self, seq: &[u8], kmer_pos: usize) -> Result<()> {
        if seq.len() > MAX_READ_LEN {
            return Err(KmrError::InvalidInput(format!(
                "read of length {} exceeds maximum {}",
                seq.len(),
                MAX_READ_LEN
            )));
        }
        if kmer_pos > MAX_READ_LEN {
            return Err(KmrError::InvalidInput(format!(
                "k-mer position {} exceeds maximum {}",
                kmer_pos, MAX_READ_LEN
            )));
        }
        let offset = MAX_READ_LEN - kmer_pos;
        for (i, &b) in seq.iter().enumerate() {
            if b == b'N' || b == b'n' {
                continue;
            }
            let bits = base_to_bits(b).ok_or_else(|| {
                KmrError::InvalidInput(format!("invalid base {:?} in read", b as char))
            })?;
            self.p[i + offset][bits as usize] += 1;
        }
        Ok(())
    }

    /// Presence vector for a profile built from a single sample: 1 wherever
    /// any base was counted.
    pub fn single_sample_counts(&self) -> Vec<u64> {
        self.p
            .iter()
            .map(|row| u64::from(row.iter().any(|&x| x > 0)))
            .collect()
    }

    /// Element-wise sum of both arrays.
    pub fn add(&mut self, other: &ProfileData) {
        for (row, other_row) in self.p.iter_mut().zip(&other.p) {
            for (x, y) in row.iter_mut().zip(other_row) {
                *x += y;
            }
        }
        for (x, y) in self.c.iter_mut().zip(&other.c) {
            *x += y;
        }
    }
}

/// Handler for [`ProfileData`]. Merging sums both arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileHandler;

/// A k-mer and its surrounding base profile.
pub type ProfileTuple = Tuple<ProfileHandler>;

impl DataHandler for ProfileHandler {
    type Data = ProfileData;

    const NAME: &'static str = "prf";

    fn encode<W: Write + ?Sized>(data: &ProfileData, w: &mut W) -> Result<()> {
        write_uvarint(w, (data.p.len() * 4) as u64)?;
        for row in &data.p {
            for &x in row {
                write_uvarint(w, x)?;
            }
        }
        write_uvarint(w, data.c.len() as u64)?;
        for &x in &data.c {
            write_uvarint(w, x)?;
        }
        Ok(())
    }

    fn decode<R: BufRead + ?Sized>(data: &mut ProfileData, r: &mut R) -> Result<()> {
        let n = expect_len(r, "profile length")?;
        if n != PROFILE_LEN * 4 {
            return Err(KmrError::CorruptRecord(format!(
                "unexpected profile length: {}, want {}",
                n,
                PROFILE_LEN * 4
            )));
        }
        data.p.resize(PROFILE_LEN, [0; 4]);
        for row in data.p.iter_mut() {
            for x in row.iter_mut() {
                *x = expect_uvarint(r, "profile")?;
            }
        }

        let n = expect_len(r, "sample counts length")?;
        if n != PROFILE_LEN {
            return Err(KmrError::CorruptRecord(format!(
                "unexpected counts length: {}, want {}",
                n, PROFILE_LEN
            )));
        }
        data.c.resize(PROFILE_LEN, 0);
        for x in data.c.iter_mut() {
            *x = expect_uvarint(r, "sample counts")?;
        }
        Ok(())
    }

    fn merge(into: &mut ProfileData, other: &ProfileData) {
        into.add(other);
    }

    /// Renders as `A:..;C:..;G:..;T:..\tcounts` with comma-separated columns.
    fn write_text(data: &ProfileData, out: &mut Vec<u8>) {
        let mut buf = itoa::Buffer::new();
        for (base_idx, base) in [b'A', b'C', b'G', b'T'].iter().enumerate() {
            if base_idx > 0 {
                out.push(b';');
            }
            out.push(*base);
            out.push(b':');
            for (i, row) in data.p.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(buf.format(row[base_idx]).as_bytes());
            }
        }
        out.push(b'\t');
        for (i, &x) in data.c.iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            out.extend_from_slice(buf.format(x).as_bytes());
        }
    }
}
