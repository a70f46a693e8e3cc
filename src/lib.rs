// Clippy allows for the whole crate
#![allow(clippy::should_implement_trait)]
#![allow(clippy::type_complexity)]

//! KMR: sorted k-mer stream toolkit
//!
//! This library counts, tracks and merges k-mers across many samples. Every
//! data set is a stream of *tuples*, a fixed-width packed k-mer key plus a
//! payload, sorted by key. Tools produce such streams independently per
//! sample or shard, and a k-way merge combines them into one.
//!
//! # Features
//!
//! - **Generic merge engine**: one heap-based merger for every payload kind
//! - **Streaming I/O**: inputs are never loaded in full; gzip is transparent
//! - **Compact encodings**: varint records and condensed key dumps
//! - **Fail-fast ordering checks**: unsorted inputs abort the merge
//!
//! # Example
//!
//! ```rust
//! use kmr::prelude::*;
//!
//! let k = |b: u8| Kmer([0, 0, 0, 0, 0, 0, 0, b]);
//! let mut a = Vec::new();
//! let mut b = Vec::new();
//! for (kmer, n) in [(1, 2), (4, 1)] {
//!     CountTuple::new(k(kmer), CountData { count: n }).encode(&mut a).unwrap();
//! }
//! CountTuple::new(k(4), CountData { count: 6 }).encode(&mut b).unwrap();
//!
//! let mut merger = Merger::<CountHandler>::new();
//! merger.add_reader(&a[..]).unwrap();
//! merger.add_reader(&b[..]).unwrap();
//!
//! let mut out = Vec::new();
//! let stats = merger.dump(&mut out).unwrap();
//! assert_eq!(stats.tuples_written, 2);
//! ```

pub mod checkpoints;
pub mod commands;
pub mod config;
pub mod counts;
pub mod delta;
pub mod dump;
pub mod error;
pub mod gmerge;
pub mod io;
pub mod kmer;
pub mod merger;
pub mod parts;
pub mod presence;
pub mod progress;
pub mod tuple;
pub mod varint;

// Re-export commonly used types
pub use error::{KmrError, Result};
pub use kmer::Kmer;
pub use merger::{MergeStats, Merger, TupleReader, TupleSource, TupleWriter};
pub use tuple::{DataHandler, PayloadKind, Tuple};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::checkpoints::{bucket_of, checkpoints};
    pub use crate::dump::{KeyReader, KeyWriter};
    pub use crate::error::{KmrError, Result};
    pub use crate::kmer::Kmer;
    pub use crate::merger::{Merger, TupleReader, TupleSource, TupleWriter};
    pub use crate::presence::HasBuilder;
    pub use crate::tuple::{
        CountData, CountHandler, CountTuple, DataHandler, GeneSetData, GeneSetHandler,
        GeneSetTuple, HasData, HasHandler, HasTuple, PayloadKind, ProfileData, ProfileHandler,
        ProfileTuple, Tuple,
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_basic_workflow() {
        let content = "\
AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAC\t4
CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC\t1
";
        let mut builder = crate::counts::CountBuilder::new();
        builder.add_reader(content.as_bytes()).unwrap();
        let mut sample_a = Vec::new();
        builder.write(&mut sample_a).unwrap();

        let mut sample_b = Vec::new();
        let c = Kmer::from_dna(b"CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC").unwrap();
        CountTuple::new(c, CountData { count: 9 })
            .encode(&mut sample_b)
            .unwrap();

        let mut merger = Merger::<CountHandler>::new();
        merger.add_reader(&sample_a[..]).unwrap();
        merger.add_reader(&sample_b[..]).unwrap();
        let merged: Vec<CountTuple> = merger.collect::<Result<_>>().unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].data.count, 4);
        assert_eq!(merged[1].kmer, c);
        assert_eq!(merged[1].data.count, 10);
    }

    #[test]
    fn test_partitioned_key_dump() {
        let cps = checkpoints(3);
        let keys = [Kmer::MIN, Kmer([0x40; 8]), Kmer::MAX];

        let mut buckets = vec![Vec::new(); cps.len()];
        for k in keys {
            buckets[bucket_of(&k, &cps)].push(k);
        }
        let mut total = 0;
        for bucket in &buckets {
            let mut w = KeyWriter::new(Vec::new());
            for k in bucket {
                w.write(k).unwrap();
            }
            let buf = w.into_inner().unwrap();
            let back: Vec<Kmer> = KeyReader::new(&buf[..]).collect::<Result<_>>().unwrap();
            assert_eq!(&back, bucket);
            total += back.len();
        }
        assert_eq!(total, keys.len());
        assert_eq!(buckets.last().unwrap().last(), Some(&Kmer::MAX));
    }
}
