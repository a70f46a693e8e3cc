//! Merge sorted tuple files of one payload kind into a single sorted file.

use crate::error::Result;
use crate::merger::{merge_paths, MergeStats};
use crate::parts::choose_part;
use crate::tuple::{CountHandler, GeneSetHandler, HasHandler, PayloadKind, ProfileHandler};
use log::{info, warn};
use std::path::Path;

/// Merge command configuration.
#[derive(Debug, Clone)]
pub struct MergeCommand {
    pub payload: PayloadKind,
    /// 0-based input part to merge.
    pub part: usize,
    pub nparts: usize,
}

impl MergeCommand {
    pub fn new(payload: PayloadKind) -> Self {
        Self {
            payload,
            part: 0,
            nparts: 1,
        }
    }

    /// Merge only the inputs whose name hashes into `part` of `nparts`
    /// (builder pattern).
    pub fn with_part(mut self, part: usize, nparts: usize) -> Self {
        self.part = part;
        self.nparts = nparts;
        self
    }

    /// Merge `inputs` into `output`.
    ///
    /// The output is written atomically. Selecting no inputs still produces
    /// an (empty) output so downstream steps find the file they expect.
    pub fn run<S: AsRef<str>, P: AsRef<Path>>(
        &self,
        inputs: &[S],
        output: P,
    ) -> Result<MergeStats> {
        let (chosen, _) = choose_part(inputs, self.part, self.nparts)?;
        if chosen.is_empty() {
            warn!("No inputs in part {} of {}", self.part + 1, self.nparts);
        } else {
            info!("Selected {} of {} inputs", chosen.len(), inputs.len());
        }
        let paths: Vec<&str> = chosen.iter().map(|s| AsRef::<str>::as_ref(*s)).collect();

        match self.payload {
            PayloadKind::Count => merge_paths::<CountHandler, _, _>(&paths[..], output),
            PayloadKind::Has => merge_paths::<HasHandler, _, _>(&paths[..], output),
            PayloadKind::Profile => merge_paths::<ProfileHandler, _, _>(&paths[..], output),
            PayloadKind::Genes => merge_paths::<GeneSetHandler, _, _>(&paths[..], output),
        }
    }
}
