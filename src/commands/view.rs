//! Print a tuple file as text, one `kmer\tpayload` line per tuple.

use crate::error::Result;
use crate::io::{self as kio, DEFAULT_OUTPUT_BUFFER};
use crate::merger::{TupleReader, TupleSource};
use crate::tuple::{
    CountHandler, DataHandler, GeneSetHandler, HasHandler, PayloadKind, ProfileHandler, Tuple,
};
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// View command configuration.
#[derive(Debug, Clone)]
pub struct ViewCommand {
    pub payload: PayloadKind,
    /// Stop after this many tuples.
    pub limit: Option<u64>,
}

impl ViewCommand {
    pub fn new(payload: PayloadKind) -> Self {
        Self {
            payload,
            limit: None,
        }
    }

    /// Set limit (builder pattern).
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Print the tuples of `input`. Returns the number printed.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: &mut W) -> Result<u64> {
        self.run_reader(kio::open(input)?, output)
    }

    pub fn run_reader<R: BufRead, W: Write>(&self, reader: R, output: &mut W) -> Result<u64> {
        match self.payload {
            PayloadKind::Count => self.view::<CountHandler, _, _>(reader, output),
            PayloadKind::Has => self.view::<HasHandler, _, _>(reader, output),
            PayloadKind::Profile => self.view::<ProfileHandler, _, _>(reader, output),
            PayloadKind::Genes => self.view::<GeneSetHandler, _, _>(reader, output),
        }
    }

    fn view<H: DataHandler, R: BufRead, W: Write>(&self, reader: R, output: &mut W) -> Result<u64> {
        let mut reader = TupleReader::<R, H>::new(reader);
        let mut writer = BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, output);
        let mut tuple = Tuple::<H>::empty();
        let mut line = Vec::with_capacity(256);
        let mut printed = 0u64;

        while self.limit.is_none_or(|l| printed < l) && reader.next_into(&mut tuple)? {
            line.clear();
            tuple.write_text(&mut line);
            writer.write_all(&line)?;
            printed += 1;
        }
        writer.flush()?;
        Ok(printed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::Kmer;
    use crate::tuple::{CountData, CountTuple, HasData, HasTuple};

    #[test]
    fn test_view_counts() {
        let mut buf = Vec::new();
        CountTuple::new(Kmer::MIN, CountData { count: 3 })
            .encode(&mut buf)
            .unwrap();
        CountTuple::new(Kmer::MAX, CountData { count: 12 })
            .encode(&mut buf)
            .unwrap();

        let mut out = Vec::new();
        let n = ViewCommand::new(PayloadKind::Count)
            .run_reader(&buf[..], &mut out)
            .unwrap();
        assert_eq!(n, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("{}\t3", "A".repeat(32)));
        assert_eq!(lines[1], format!("{}\t12", "T".repeat(32)));
    }

    #[test]
    fn test_view_limit() {
        let mut buf = Vec::new();
        for i in 0..5u8 {
            HasTuple::new(Kmer([0, 0, 0, 0, 0, 0, 0, i]), HasData::from_samples(vec![1, 2]))
                .encode(&mut buf)
                .unwrap();
        }
        let mut out = Vec::new();
        let n = ViewCommand::new(PayloadKind::Has)
            .with_limit(Some(2))
            .run_reader(&buf[..], &mut out)
            .unwrap();
        assert_eq!(n, 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|l| l.ends_with("\t1,2")));
    }

    #[test]
    fn test_view_wrong_payload_fails() {
        let mut buf = Vec::new();
        HasTuple::new(Kmer::MIN, HasData::from_samples(vec![5, 1]))
            .encode(&mut buf)
            .unwrap();
        // Read back as a profile: the payload lengths cannot match.
        let mut out = Vec::new();
        assert!(ViewCommand::new(PayloadKind::Profile)
            .run_reader(&buf[..], &mut out)
            .is_err());
    }
}
