//! Gene-set payload: the genes a k-mer was found in.

use super::{DataHandler, Tuple};
use crate::error::Result;
use crate::varint::{expect_len, expect_string, write_str, write_uvarint};
use std::collections::BTreeSet;
use std::io::{BufRead, Write};

/// Names of genes containing a k-mer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneSetData {
    pub genes: BTreeSet<String>,
}

impl GeneSetData {
    pub fn from_genes<I, S>(genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            genes: genes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Handler for [`GeneSetData`]. Merging is set union.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneSetHandler;

/// A k-mer and the genes that contain it.
pub type GeneSetTuple = Tuple<GeneSetHandler>;

impl DataHandler for GeneSetHandler {
    type Data = GeneSetData;

    const NAME: &'static str = "genes";

    fn encode<W: Write + ?Sized>(data: &GeneSetData, w: &mut W) -> Result<()> {
        write_uvarint(w, data.genes.len() as u64)?;
        for gene in &data.genes {
            write_str(w, gene)?;
        }
        Ok(())
    }

    fn decode<R: BufRead + ?Sized>(data: &mut GeneSetData, r: &mut R) -> Result<()> {
        let n = expect_len(r, "gene count")?;
        data.genes.clear();
        for _ in 0..n {
            data.genes.insert(expect_string(r, "gene name")?);
        }
        Ok(())
    }

    fn merge(into: &mut GeneSetData, other: &GeneSetData) {
        for gene in &other.genes {
            if !into.genes.contains(gene) {
                into.genes.insert(gene.clone());
            }
        }
    }

    fn write_text(data: &GeneSetData, out: &mut Vec<u8>) {
        for (i, gene) in data.genes.iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            out.extend_from_slice(gene.as_bytes());
        }
    }
}
