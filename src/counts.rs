//! Building sorted count streams from k-mer counter output.
//!
//! External counters emit one `kmer\tcount` line per distinct k-mer. The
//! k-mer column is either a full [`KMER_LEN`]-mer (its variant position is
//! dropped) or an already neutralized [`KEY_BASES`]-mer.
//!
//! Counts from every input are accumulated in memory, then sorted in parallel
//! and written as [`CountTuple`]s. Two accumulation modes exist:
//!
//! - [`CountMode::Occurrences`] sums the count column.
//! - [`CountMode::Samples`] ignores it and adds one per input, giving the
//!   number of samples in which each k-mer appears.
//!
//! Memory grows with the number of distinct k-mers kept. Large sample sets
//! are split with `kmer_part`/`kmer_parts`, where each run only keeps k-mers
//! whose hash falls in its part, and the per-part outputs are merged
//! afterwards.

use crate::error::{KmrError, Result};
use crate::io::{self as kio, DEFAULT_OUTPUT_BUFFER};
use crate::kmer::{Kmer, KEY_BASES, KMER_LEN};
use crate::merger::TupleWriter;
use crate::parts::{check_part, in_part};
use crate::tuple::{CountData, CountHandler, CountTuple};
use log::{debug, info};
use memchr::memchr;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// What a k-mer's count means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    /// Sum of the count column over all inputs.
    #[default]
    Occurrences,
    /// Number of inputs containing the k-mer.
    Samples,
}

/// Statistics from a counting run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountStats {
    pub inputs: usize,
    pub lines: u64,
    /// Lines whose k-mer fell in the selected part.
    pub kept: u64,
    pub distinct: u64,
}

impl std::fmt::Display for CountStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Inputs: {}, Lines: {}, Kept: {}, Distinct k-mers: {}",
            self.inputs, self.lines, self.kept, self.distinct
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    count: u64,
    /// 1-based index of the last input that touched this key.
    last_input: usize,
}

/// Accumulates k-mer counts from text inputs.
#[derive(Debug, Clone)]
pub struct CountBuilder {
    counts: FxHashMap<Kmer, Slot>,
    mode: CountMode,
    kmer_part: usize,
    kmer_parts: usize,
    stats: CountStats,
}

impl Default for CountBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CountBuilder {
    pub fn new() -> Self {
        Self {
            counts: FxHashMap::default(),
            mode: CountMode::default(),
            kmer_part: 0,
            kmer_parts: 1,
            stats: CountStats::default(),
        }
    }

    /// Set the accumulation mode (builder pattern).
    pub fn with_mode(mut self, mode: CountMode) -> Self {
        self.mode = mode;
        self
    }

    /// Keep only k-mers in the 0-based `part` of `nparts` (builder pattern).
    pub fn with_kmer_part(mut self, part: usize, nparts: usize) -> Result<Self> {
        check_part(part, nparts)?;
        self.kmer_part = part;
        self.kmer_parts = nparts;
        Ok(self)
    }

    /// Number of distinct k-mers collected so far.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn stats(&self) -> &CountStats {
        &self.stats
    }

    /// Read one input of `kmer\tcount` lines. Blank lines are skipped.
    ///
    /// In [`CountMode::Samples`] a key counts once per input, however many
    /// lines spell it (upper and lower case, any base at the variant
    /// position).
    pub fn add_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        self.stats.inputs += 1;
        let input = self.stats.inputs;
        let (mode, part, nparts) = (self.mode, self.kmer_part, self.kmer_parts);
        let counts = &mut self.counts;
        let mut kept = 0u64;

        let lines = for_each_count(reader, |kmer, count| {
            if !in_part(&kmer.0, part, nparts) {
                return;
            }
            kept += 1;
            let slot = counts.entry(kmer).or_default();
            match mode {
                CountMode::Occurrences => slot.count = slot.count.saturating_add(count),
                CountMode::Samples => {
                    if slot.last_input != input {
                        slot.count += 1;
                        slot.last_input = input;
                    }
                }
            }
        })?;

        self.stats.lines += lines;
        self.stats.kept += kept;
        debug!(
            "Input {}: {} lines, {} distinct k-mers so far",
            input,
            lines,
            self.counts.len()
        );
        Ok(())
    }

    /// Read a counts file, decompressing `.gz` paths.
    pub fn add_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        info!("Reading counts from {}", path.as_ref().display());
        self.add_reader(kio::open(path)?)
    }

    /// The collected counts, sorted by k-mer.
    pub fn into_sorted(self) -> Vec<CountTuple> {
        let mut tuples: Vec<CountTuple> = self
            .counts
            .into_iter()
            .map(|(kmer, slot)| CountTuple::new(kmer, CountData { count: slot.count }))
            .collect();
        tuples.par_sort_unstable_by_key(|t| t.kmer);
        tuples
    }

    /// Sort the counts and encode them to `w`.
    pub fn write<W: Write>(self, w: W) -> Result<CountStats> {
        let mut stats = self.stats;
        stats.distinct = self.counts.len() as u64;

        info!("Sorting {} k-mers", stats.distinct);
        let tuples = self.into_sorted();

        let mut writer =
            TupleWriter::<_, CountHandler>::new(BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, w));
        for t in &tuples {
            writer.write(t)?;
        }
        writer
            .into_inner()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        Ok(stats)
    }
}

#[inline]
fn trim_newline(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Digits only, rejecting overflow.
#[inline]
fn parse_u64(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Split a `kmer\tcount` line.
#[inline]
fn parse_count_line(line: &[u8]) -> Option<(&[u8], u64)> {
    let tab = memchr(b'\t', line)?;
    let rest = &line[tab + 1..];
    let end = memchr(b'\t', rest).unwrap_or(rest.len());
    Some((&line[..tab], parse_u64(&rest[..end])?))
}

/// Call `f` with the packed k-mer and count of every `kmer\tcount` line in
/// `reader`. Blank lines are skipped. Returns the number of lines handled.
pub fn for_each_count<R, F>(mut reader: R, mut f: F) -> Result<u64>
where
    R: BufRead,
    F: FnMut(Kmer, u64),
{
    let mut line = Vec::with_capacity(128);
    let mut line_no = 0u64;
    let mut handled = 0u64;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_no += 1;
        let trimmed = trim_newline(&line);
        if trimmed.is_empty() {
            continue;
        }

        let (kmer_text, count) = parse_count_line(trimmed).ok_or_else(|| {
            KmrError::InvalidInput(format!(
                "line {}: expected kmer<TAB>count, got {:?}",
                line_no,
                String::from_utf8_lossy(trimmed)
            ))
        })?;
        let kmer = parse_kmer(kmer_text)
            .map_err(|e| KmrError::InvalidInput(format!("line {}: {}", line_no, e)))?;
        f(kmer, count);
        handled += 1;
    }
    Ok(handled)
}

/// Pack a full or neutralized k-mer.
pub fn parse_kmer(text: &[u8]) -> Result<Kmer> {
    match text.len() {
        KMER_LEN => Kmer::from_dna(text),
        KEY_BASES => Kmer::from_bases(text),
        n => Err(KmrError::InvalidInput(format!(
            "k-mer has {} bases, expected {} or {}",
            n, KMER_LEN, KEY_BASES
        ))),
    }
}
