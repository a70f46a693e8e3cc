//! Extract the keys of a tuple file into a condensed key dump, and print
//! such dumps back as DNA.

use crate::dump::{KeyReader, KeyWriter};
use crate::error::{KmrError, Result};
use crate::io::{self as kio, DEFAULT_OUTPUT_BUFFER};
use crate::kmer::Kmer;
use crate::merger::{TupleReader, TupleSource};
use crate::tuple::{
    CountHandler, DataHandler, GeneSetHandler, HasHandler, PayloadKind, ProfileHandler, Tuple,
};
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// Keys command configuration.
#[derive(Debug, Clone)]
pub struct KeysCommand {
    pub payload: PayloadKind,
}

impl KeysCommand {
    pub fn new(payload: PayloadKind) -> Self {
        Self { payload }
    }

    /// Write the keys of tuple file `input` to `output` in condensed form.
    /// Returns the number of keys written.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<u64> {
        let reader = kio::open(input)?;
        let mut out = kio::create(output)?;
        let n = self.run_reader(reader, &mut out)?;
        out.commit()?;
        Ok(n)
    }

    pub fn run_reader<R: BufRead, W: Write>(&self, reader: R, output: W) -> Result<u64> {
        match self.payload {
            PayloadKind::Count => extract_keys::<CountHandler, _, _>(reader, output),
            PayloadKind::Has => extract_keys::<HasHandler, _, _>(reader, output),
            PayloadKind::Profile => extract_keys::<ProfileHandler, _, _>(reader, output),
            PayloadKind::Genes => extract_keys::<GeneSetHandler, _, _>(reader, output),
        }
    }

    /// Print a condensed key dump as one DNA key per line.
    pub fn print<R: BufRead, W: Write>(reader: R, output: &mut W) -> Result<u64> {
        let mut writer = BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, output);
        let mut n = 0u64;
        for kmer in KeyReader::new(reader) {
            writer.write_all(&kmer?.bases())?;
            writer.write_all(b"\n")?;
            n += 1;
        }
        writer.flush()?;
        Ok(n)
    }
}

fn extract_keys<H: DataHandler, R: BufRead, W: Write>(reader: R, output: W) -> Result<u64> {
    let mut reader = TupleReader::<R, H>::new(reader);
    let mut keys = KeyWriter::new(BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, output));
    let mut tuple = Tuple::<H>::empty();
    let mut prev: Option<Kmer> = None;

    while reader.next_into(&mut tuple)? {
        if let Some(p) = prev {
            if tuple.kmer < p {
                return Err(KmrError::OrderingViolation {
                    stream: "input".to_string(),
                    previous: p.to_string(),
                    next: tuple.kmer.to_string(),
                });
            }
        }
        keys.write(&tuple.kmer)?;
        prev = Some(tuple.kmer);
    }
    let n = keys.written();
    keys.into_inner()?;
    Ok(n)
}
