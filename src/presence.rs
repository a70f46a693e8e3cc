//! Building sample-presence streams for a whitelist of k-mers.
//!
//! The whitelist is a sorted count file, usually the output of `filter`.
//! Every sample input is counter text (`kmer\tcount`); a whitelisted k-mer
//! that appears in it gets the sample's index appended. Samples must be added
//! in increasing index order, which keeps every list strictly increasing
//! without a sort.

use crate::counts::for_each_count;
use crate::error::{KmrError, Result};
use crate::io::{self as kio, DEFAULT_OUTPUT_BUFFER};
use crate::kmer::Kmer;
use crate::merger::{TupleReader, TupleSource, TupleWriter};
use crate::progress::ProgressTracker;
use crate::tuple::{CountHandler, CountTuple, HasData, HasHandler, HasTuple};
use log::{debug, info};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// Statistics from building presence lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HasStats {
    pub whitelist: u64,
    pub inputs: usize,
    pub lines: u64,
    /// Lines whose k-mer was whitelisted.
    pub hits: u64,
    /// Whitelisted k-mers present in at least one sample.
    pub written: u64,
}

impl std::fmt::Display for HasStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Whitelist: {}, Inputs: {}, Lines: {}, Hits: {}, K-mers written: {}",
            self.whitelist, self.inputs, self.lines, self.hits, self.written
        )
    }
}

/// Collects, per whitelisted k-mer, the samples that contain it.
#[derive(Debug, Clone, Default)]
pub struct HasBuilder {
    samples: FxHashMap<Kmer, Vec<u64>>,
    last_sample: Option<u64>,
    stats: HasStats,
}

impl HasBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whitelist the given keys.
    pub fn from_keys<I: IntoIterator<Item = Kmer>>(keys: I) -> Self {
        let mut b = Self::new();
        for k in keys {
            b.samples.entry(k).or_default();
        }
        b.stats.whitelist = b.samples.len() as u64;
        b
    }

    /// Whitelist every key of a count tuple stream.
    pub fn load_whitelist<R: BufRead>(&mut self, reader: R) -> Result<u64> {
        let mut reader = TupleReader::<R, CountHandler>::new(reader);
        let mut t = CountTuple::empty();
        let mut progress = ProgressTracker::new("Read whitelist k-mers");
        while reader.next_into(&mut t)? {
            self.samples.entry(t.kmer).or_default();
            progress.inc();
        }
        progress.finish();
        self.stats.whitelist = self.samples.len() as u64;
        Ok(progress.count())
    }

    /// Whitelist the keys of a count file, decompressing `.gz` paths.
    pub fn load_whitelist_path<P: AsRef<Path>>(&mut self, path: P) -> Result<u64> {
        info!("Reading k-mer whitelist from {}", path.as_ref().display());
        self.load_whitelist(kio::open(path)?)
    }

    /// Number of whitelisted k-mers.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn stats(&self) -> &HasStats {
        &self.stats
    }

    /// Record `sample` for every whitelisted k-mer in `reader`.
    ///
    /// Sample indices must strictly increase from call to call.
    pub fn add_reader<R: BufRead>(&mut self, sample: u64, reader: R) -> Result<()> {
        if let Some(last) = self.last_sample {
            if sample <= last {
                return Err(KmrError::InvalidInput(format!(
                    "sample {} added after sample {}",
                    sample, last
                )));
            }
        }
        self.last_sample = Some(sample);
        self.stats.inputs += 1;

        let samples = &mut self.samples;
        let mut hits = 0u64;
        let lines = for_each_count(reader, |kmer, _| {
            if let Some(list) = samples.get_mut(&kmer) {
                hits += 1;
                // Several spellings of one key may appear in a single input.
                if list.last() != Some(&sample) {
                    list.push(sample);
                }
            }
        })?;
        self.stats.lines += lines;
        self.stats.hits += hits;
        debug!("Sample {}: {} lines, {} whitelisted", sample, lines, hits);
        Ok(())
    }

    /// Read one sample's counter output, decompressing `.gz` paths.
    pub fn add_path<P: AsRef<Path>>(&mut self, sample: u64, path: P) -> Result<()> {
        self.add_reader(sample, kio::open(path)?)
    }

    /// Presence tuples for k-mers seen in at least one sample, sorted by key.
    pub fn into_sorted(self) -> Vec<HasTuple> {
        let mut tuples: Vec<HasTuple> = self
            .samples
            .into_iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(kmer, s)| HasTuple::new(kmer, HasData::from_samples(s)))
            .collect();
        tuples.par_sort_unstable_by_key(|t| t.kmer);
        tuples
    }

    /// Sort and encode the presence tuples to `w`.
    pub fn write<W: Write>(self, w: W) -> Result<HasStats> {
        let mut stats = self.stats;
        let tuples = self.into_sorted();
        stats.written = tuples.len() as u64;
        info!("Writing {} k-mers", stats.written);

        let mut writer =
            TupleWriter::<_, HasHandler>::new(BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, w));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::KMER_LEN;
    use crate::tuple::CountData;

    fn dna(c: u8, first: u8) -> String {
        let mut s = vec![c; KMER_LEN];
        s[0] = first;
        String::from_utf8(s).unwrap()
    }

    fn key(text: &str) -> Kmer {
        Kmer::from_dna(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_presence_lists() {
        let (a, c, g) = (dna(b'A', b'A'), dna(b'C', b'C'), dna(b'G', b'G'));
        let mut b = HasBuilder::from_keys([key(&a), key(&c)]);
        b.add_reader(0, format!("{}\t3\n{}\t9\n", a, g).as_bytes())
            .unwrap();
        b.add_reader(2, format!("{}\t1\n{}\t1\n", c, a).as_bytes())
            .unwrap();
        b.add_reader(5, format!("{}\t1\n", g).as_bytes()).unwrap();

        let got = b.into_sorted();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].kmer, key(&a));
        assert_eq!(got[0].data.samples, vec![0, 2]);
        assert_eq!(got[1].data.samples, vec![2]);
    }

    #[test]
    fn test_unseen_kmers_are_dropped() {
        let a = dna(b'A', b'A');
        let b = HasBuilder::from_keys([key(&a), Kmer::MAX]);
        assert_eq!(b.len(), 2);
        assert!(b.into_sorted().is_empty());
    }

    #[test]
    fn test_repeated_spelling_in_one_sample() {
        let a = dna(b'A', b'A');
        let mut b = HasBuilder::from_keys([key(&a)]);
        let text = format!("{}\t1\n{}\t1\n", a, a.to_ascii_lowercase());
        b.add_reader(4, text.as_bytes()).unwrap();
        assert_eq!(b.stats().hits, 2);
        assert_eq!(b.into_sorted()[0].data.samples, vec![4]);
    }

    #[test]
    fn test_samples_must_increase() {
        let mut b = HasBuilder::from_keys([Kmer::MIN]);
        b.add_reader(3, &b""[..]).unwrap();
        assert!(b.add_reader(3, &b""[..]).is_err());
        assert!(b.add_reader(1, &b""[..]).is_err());
    }

    #[test]
    fn test_whitelist_and_write() {
        let a = dna(b'A', b'T');
        let mut wl = Vec::new();
        CountTuple::new(key(&a), CountData { count: 7 })
            .encode(&mut wl)
            .unwrap();
        CountTuple::new(Kmer::MAX, CountData { count: 2 })
            .encode(&mut wl)
            .unwrap();

        let mut b = HasBuilder::new();
        assert_eq!(b.load_whitelist(&wl[..]).unwrap(), 2);
        b.add_reader(1, format!("{}\t1\n", a).as_bytes()).unwrap();

        let mut out = Vec::new();
        let stats = b.write(&mut out).unwrap();
        assert_eq!(stats.whitelist, 2);
        assert_eq!(stats.written, 1);

        let got: Vec<HasTuple> = TupleReader::new(&out[..]).collect::<Result<_>>().unwrap();
        assert_eq!(got, vec![HasTuple::new(key(&a), HasData::from_samples(vec![1]))]);
    }
}
