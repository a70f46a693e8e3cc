//! Turn k-mer counter text output into a sorted count tuple file.

use crate::counts::{CountBuilder, CountMode, CountStats};
use crate::error::{KmrError, Result};
use crate::io as kio;
use crate::parts::choose_part;
use log::info;
use std::path::Path;

/// Count command configuration.
#[derive(Debug, Clone)]
pub struct CountCommand {
    pub mode: CountMode,
    /// 0-based input part.
    pub part: usize,
    pub nparts: usize,
    /// 0-based k-mer part.
    pub kmer_part: usize,
    pub kmer_parts: usize,
}

impl Default for CountCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CountCommand {
    pub fn new() -> Self {
        Self {
            mode: CountMode::Occurrences,
            part: 0,
            nparts: 1,
            kmer_part: 0,
            kmer_parts: 1,
        }
    }

    pub fn with_mode(mut self, mode: CountMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_part(mut self, part: usize, nparts: usize) -> Self {
        self.part = part;
        self.nparts = nparts;
        self
    }

    pub fn with_kmer_part(mut self, part: usize, nparts: usize) -> Self {
        self.kmer_part = part;
        self.kmer_parts = nparts;
        self
    }

    /// Count the selected inputs and write sorted count tuples to `output`.
    pub fn run<S: AsRef<str>, P: AsRef<Path>>(
        &self,
        inputs: &[S],
        output: P,
    ) -> Result<CountStats> {
        if inputs.is_empty() {
            return Err(KmrError::InvalidInput("got no input files".to_string()));
        }
        let (chosen, _) = choose_part(inputs, self.part, self.nparts)?;
        info!("Found {} files to count", chosen.len());

        let mut builder = CountBuilder::new()
            .with_mode(self.mode)
            .with_kmer_part(self.kmer_part, self.kmer_parts)?;
        for (i, path) in chosen.iter().enumerate() {
            let path: &str = path.as_ref();
            info!("Opening {}/{}: {}", i + 1, chosen.len(), path);
            builder.add_path(path)?;
        }

        let mut out = kio::create(output)?;
        let stats = builder.write(&mut out)?;
        out.commit()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merger::TupleReader;
    use crate::tuple::{CountHandler, CountTuple};

    fn full_kmer(c: char) -> String {
        std::iter::repeat_n(c, crate::kmer::KMER_LEN).collect()
    }

    #[test]
    fn test_count_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, format!("{}\t3\n{}\t1\n", full_kmer('G'), full_kmer('A'))).unwrap();
        std::fs::write(&b, format!("{}\t2\n", full_kmer('G'))).unwrap();
        let out = dir.path().join("out.cnt");

        let inputs = [a.to_string_lossy().into_owned(), b.to_string_lossy().into_owned()];
        let stats = CountCommand::new().run(&inputs, &out).unwrap();
        assert_eq!(stats.distinct, 2);

        let got: Vec<CountTuple> = TupleReader::<_, CountHandler>::open(&out)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].data.count, 1);
        assert_eq!(got[1].data.count, 5);

        let samples = CountCommand::new()
            .with_mode(CountMode::Samples)
            .run(&inputs, &out)
            .unwrap();
        assert_eq!(samples.distinct, 2);
        let got: Vec<CountTuple> = TupleReader::<_, CountHandler>::open(&out)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(got[1].data.count, 2);
    }

    #[test]
    fn test_no_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: [&str; 0] = [];
        assert!(CountCommand::new()
            .run(&inputs, dir.path().join("out.cnt"))
            .is_err());
    }
}
