//! Record which samples contain each whitelisted k-mer.

use crate::error::{KmrError, Result};
use crate::io as kio;
use crate::parts::choose_part;
use crate::presence::{HasBuilder, HasStats};
use log::info;
use std::path::Path;

/// Has command configuration.
#[derive(Debug, Clone)]
pub struct HasCommand {
    /// 0-based input part.
    pub part: usize,
    pub nparts: usize,
}

impl Default for HasCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl HasCommand {
    pub fn new() -> Self {
        Self { part: 0, nparts: 1 }
    }

    pub fn with_part(mut self, part: usize, nparts: usize) -> Self {
        self.part = part;
        self.nparts = nparts;
        self
    }

    /// Build presence tuples for the whitelist in `whitelist` over the
    /// selected `inputs`.
    ///
    /// Each input's sample index is its position in the full `inputs` list,
    /// so part outputs merge into one consistent presence file.
    pub fn run<W: AsRef<Path>, S: AsRef<str>, P: AsRef<Path>>(
        &self,
        whitelist: W,
        inputs: &[S],
        output: P,
    ) -> Result<HasStats> {
        if inputs.is_empty() {
            return Err(KmrError::InvalidInput("got no input files".to_string()));
        }
        let (chosen, indices) = choose_part(inputs, self.part, self.nparts)?;
        info!("Found {} of {} samples", chosen.len(), inputs.len());

        let mut builder = HasBuilder::new();
        builder.load_whitelist_path(whitelist)?;
        for (path, &sample) in chosen.iter().zip(&indices) {
            let path: &str = path.as_ref();
            info!("Opening sample {}: {}", sample, path);
            builder.add_path(sample as u64, path)?;
        }

        let mut out = kio::create(output)?;
        let stats = builder.write(&mut out)?;
        out.commit()?;
        Ok(stats)
    }
}
