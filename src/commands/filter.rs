//! Keep the k-mers of a count file whose count reaches a threshold.

use crate::error::{KmrError, Result};
use crate::io::{self as kio, DEFAULT_OUTPUT_BUFFER};
use crate::merger::{TupleReader, TupleSource, TupleWriter};
use crate::progress::ProgressTracker;
use crate::tuple::{CountHandler, CountTuple};
use log::info;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// Statistics from filtering a count file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub read: u64,
    pub kept: u64,
}

impl std::fmt::Display for FilterStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Read: {}, Kept: {}", self.read, self.kept)
    }
}

/// Filter command configuration.
#[derive(Debug, Clone, Default)]
pub struct FilterCommand {
    /// Smallest count kept.
    pub min_count: u64,
    /// Remove the input file once the output is committed.
    pub delete_input: bool,
}

impl FilterCommand {
    pub fn new(min_count: u64) -> Self {
        Self {
            min_count,
            delete_input: false,
        }
    }

    pub fn with_delete_input(mut self, delete: bool) -> Self {
        self.delete_input = delete;
        self
    }

    /// Filter a count stream. Keys must strictly increase.
    pub fn filter<R: BufRead, W: Write>(&self, input: R, output: W) -> Result<FilterStats> {
        let mut reader = TupleReader::<R, CountHandler>::new(input);
        let mut writer = TupleWriter::<_, CountHandler>::new(BufWriter::with_capacity(
            DEFAULT_OUTPUT_BUFFER,
            output,
        ));
        let mut progress = ProgressTracker::new("Filtered k-mers");
        let mut stats = FilterStats::default();
        let mut t = CountTuple::empty();
        let mut prev = None;

        while reader.next_into(&mut t)? {
            if let Some(p) = prev {
                if t.kmer <= p {
                    return Err(KmrError::OrderingViolation {
                        stream: "input".to_string(),
                        previous: p.to_string(),
                        next: t.kmer.to_string(),
                    });
                }
            }
            prev = Some(t.kmer);
            stats.read += 1;
            progress.inc();
            if t.data.count >= self.min_count {
                writer.write(&t)?;
                stats.kept += 1;
            }
        }
        progress.finish();

        writer
            .into_inner()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        Ok(stats)
    }

    /// Filter `input` into `output`; the output is written atomically.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<FilterStats> {
        let input = input.as_ref();
        info!("Keeping k-mers with count >= {}", self.min_count);

        let mut out = kio::create(output)?;
        let stats = self.filter(kio::open(input)?, &mut out)?;
        out.commit()?;

        if self.delete_input && input != Path::new("-") {
            std::fs::remove_file(input)?;
            info!("Deleted {}", input.display());
        }
        Ok(stats)
    }
}
