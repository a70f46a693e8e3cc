//! K-mer tuples: a key paired with a payload whose behaviour is supplied by a
//! [`DataHandler`].
//!
//! Every tool in the pipeline speaks the same record layout:
//!
//! ```text
//! [varint key length = KMER_BYTES][key bytes][payload bytes]
//! ```
//!
//! The payload layout belongs to the handler. Because the merge engine only
//! ever talks to a handler through this trait, the same heap and the same
//! codec serve counts, presence lists, profiles and gene sets.

pub mod count;
pub mod genes;
pub mod has;
pub mod profile;

pub use count::{CountData, CountHandler, CountTuple};
pub use genes::{GeneSetData, GeneSetHandler, GeneSetTuple};
pub use has::{HasData, HasHandler, HasTuple};
pub use profile::{ProfileData, ProfileHandler, ProfileTuple};

use crate::error::{KmrError, Result};
use crate::kmer::{Kmer, KMER_BYTES};
use crate::varint::{read_exact_in_record, read_uvarint, write_bytes};
use std::fmt;
use std::io::{BufRead, Write};

/// Payload-specific behaviour for a [`Tuple`].
///
/// Handlers are zero-sized strategy types. `Default` on the data type is the
/// empty payload given to freshly constructed tuples, and `Clone` is the deep
/// copy used when a merged tuple must outlive the cursor it came from.
pub trait DataHandler: 'static {
    type Data: Clone + Default + PartialEq + fmt::Debug + Send;

    /// Short name used by the command line payload selector.
    const NAME: &'static str;

    /// Write the payload.
    fn encode<W: Write + ?Sized>(data: &Self::Data, w: &mut W) -> Result<()>;

    /// Read a payload into `data`, reusing its allocations where possible.
    ///
    /// The key has already been read, so running out of input here is always
    /// a truncation error.
    fn decode<R: BufRead + ?Sized>(data: &mut Self::Data, r: &mut R) -> Result<()>;

    /// Fold `other` into `into`. Both payloads belong to the same key.
    fn merge(into: &mut Self::Data, other: &Self::Data);

    /// Append a human-readable rendering of the payload.
    fn write_text(data: &Self::Data, out: &mut Vec<u8>);

    /// The identity payload.
    fn zero() -> Self::Data {
        Self::Data::default()
    }
}

/// A k-mer with a payload attached.
pub struct Tuple<H: DataHandler> {
    pub kmer: Kmer,
    pub data: H::Data,
}

impl<H: DataHandler> Tuple<H> {
    pub fn new(kmer: Kmer, data: H::Data) -> Self {
        Self { kmer, data }
    }

    /// A tuple holding the smallest key and the handler's zero payload.
    pub fn empty() -> Self {
        Self::new(Kmer::MIN, H::zero())
    }

    /// Write the key and payload.
    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        write_bytes(w, &self.kmer.0)?;
        H::encode(&self.data, w)
    }

    /// Read the next record into this tuple.
    ///
    /// Returns `Ok(false)` when the input is exhausted on a record boundary.
    /// A key length other than [`KMER_BYTES`] is a corrupt record.
    pub fn decode<R: BufRead + ?Sized>(&mut self, r: &mut R) -> Result<bool> {
        let n = match read_uvarint(r)? {
            Some(n) => n,
            None => return Ok(false),
        };
        if n != KMER_BYTES as u64 {
            return Err(KmrError::CorruptRecord(format!(
                "bad k-mer length: {}, want {}",
                n, KMER_BYTES
            )));
        }
        read_exact_in_record(r, &mut self.kmer.0, "k-mer")?;
        H::decode(&mut self.data, r)?;
        Ok(true)
    }

    /// Merge the payload of another tuple with the same key into this one.
    ///
    /// # Panics
    ///
    /// Panics if the keys differ. That can only happen when the merge logic
    /// itself is wired wrong, never because of bad input.
    pub fn add(&mut self, other: &Tuple<H>) {
        if self.kmer != other.kmer {
            panic!("mismatching k-mers: {} {}", self.kmer, other.kmer);
        }
        H::merge(&mut self.data, &other.data);
    }

    /// Append `kmer\tpayload\n` to `out`.
    pub fn write_text(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.kmer.to_string().as_bytes());
        out.push(b'\t');
        H::write_text(&self.data, out);
        out.push(b'\n');
    }
}

impl<H: DataHandler> Clone for Tuple<H> {
    fn clone(&self) -> Self {
        Self {
            kmer: self.kmer,
            data: self.data.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.kmer = source.kmer;
        self.data.clone_from(&source.data);
    }
}

impl<H: DataHandler> Default for Tuple<H> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<H: DataHandler> PartialEq for Tuple<H> {
    fn eq(&self, other: &Self) -> bool {
        self.kmer == other.kmer && self.data == other.data
    }
}

impl<H: DataHandler> fmt::Debug for Tuple<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tuple")
            .field("kmer", &self.kmer)
            .field("data", &self.data)
            .finish()
    }
}

/// Payload selector used by the command line tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Count,
    Has,
    Profile,
    Genes,
}

impl PayloadKind {
    /// Parse a selector string (`cnt`, `has`, `prf`, `genes`).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cnt" | "count" => Some(Self::Count),
            "has" => Some(Self::Has),
            "prf" | "profile" => Some(Self::Profile),
            "genes" => Some(Self::Genes),
            _ => None,
        }
    }

    /// Canonical selector string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => CountHandler::NAME,
            Self::Has => HasHandler::NAME,
            Self::Profile => ProfileHandler::NAME,
            Self::Genes => GeneSetHandler::NAME,
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
