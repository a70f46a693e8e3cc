//! K-way merge of sorted tuple streams.
//!
//! Each input keeps one decoded head tuple. Cursors live in a min-heap keyed
//! on that head, so the next output key is always at the top. Tuples that
//! share a key are folded together with the handler's merge before the result
//! is emitted; every key therefore appears exactly once in the output.
//!
//! Inputs must be sorted by key (non-decreasing). A cursor that moves
//! backwards aborts the merge with [`KmrError::OrderingViolation`] naming the
//! offending input.
//!
//! A [`Merger`] is itself a [`TupleSource`], so mergers can be stacked:
//!
//! ```
//! use kmr::kmer::Kmer;
//! use kmr::merger::Merger;
//! use kmr::tuple::{CountData, CountHandler, CountTuple};
//!
//! let k = |b: u8| Kmer([b, 0, 0, 0, 0, 0, 0, 0]);
//! let t = |b: u8, n: u64| CountTuple::new(k(b), CountData { count: n });
//!
//! let mut left = Merger::<CountHandler>::new();
//! left.add(vec![t(1, 1), t(3, 1)].into_iter()).unwrap();
//! left.add(vec![t(3, 2)].into_iter()).unwrap();
//!
//! let mut top = Merger::<CountHandler>::new();
//! top.add(left).unwrap();
//! top.add(vec![t(2, 5), t(3, 10)].into_iter()).unwrap();
//!
//! let merged: Vec<_> = top.map(|r| r.unwrap().data.count).collect();
//! assert_eq!(merged, vec![1, 5, 13]);
//! ```

use crate::error::{KmrError, Result};
use crate::io::{self as kio, DEFAULT_OUTPUT_BUFFER};
use crate::kmer::Kmer;
use crate::progress::ProgressTracker;
use crate::tuple::{DataHandler, Tuple};
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::binary_heap::PeekMut;
use std::collections::BinaryHeap;
use std::io::{BufRead, BufWriter, Write};
use std::marker::PhantomData;
use std::path::Path;

/// A pull-based stream of tuples.
pub trait TupleSource<H: DataHandler> {
    /// Overwrite `into` with the next tuple.
    ///
    /// Returns `Ok(false)` once the stream is exhausted. On error the
    /// contents of `into` are unspecified.
    fn next_into(&mut self, into: &mut Tuple<H>) -> Result<bool>;
}

impl<H: DataHandler, S: TupleSource<H> + ?Sized> TupleSource<H> for &mut S {
    fn next_into(&mut self, into: &mut Tuple<H>) -> Result<bool> {
        (**self).next_into(into)
    }
}

impl<H: DataHandler, S: TupleSource<H> + ?Sized> TupleSource<H> for Box<S> {
    fn next_into(&mut self, into: &mut Tuple<H>) -> Result<bool> {
        (**self).next_into(into)
    }
}

/// In-memory tuples, mostly useful for tests and small inputs.
impl<H: DataHandler> TupleSource<H> for std::vec::IntoIter<Tuple<H>> {
    fn next_into(&mut self, into: &mut Tuple<H>) -> Result<bool> {
        match self.next() {
            Some(t) => {
                *into = t;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Decodes tuples from a byte stream.
pub struct TupleReader<R: BufRead, H: DataHandler> {
    reader: R,
    read: u64,
    _handler: PhantomData<fn() -> H>,
}

impl<R: BufRead, H: DataHandler> TupleReader<R, H> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            read: 0,
            _handler: PhantomData,
        }
    }

    /// Number of tuples decoded so far.
    pub fn read_count(&self) -> u64 {
        self.read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<H: DataHandler> TupleReader<Box<dyn BufRead + Send>, H> {
    /// Open a tuple file, decompressing `.gz` paths.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(kio::open(path)?))
    }
}

impl<R: BufRead, H: DataHandler> TupleSource<H> for TupleReader<R, H> {
    #[inline]
    fn next_into(&mut self, into: &mut Tuple<H>) -> Result<bool> {
        let ok = into.decode(&mut self.reader)?;
        if ok {
            self.read += 1;
        }
        Ok(ok)
    }
}

impl<R: BufRead, H: DataHandler> Iterator for TupleReader<R, H> {
    type Item = Result<Tuple<H>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut t = Tuple::empty();
        match self.next_into(&mut t) {
            Ok(true) => Some(Ok(t)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Encodes tuples, refusing keys that go backwards.
pub struct TupleWriter<W: Write, H: DataHandler> {
    writer: W,
    prev: Option<Kmer>,
    written: u64,
    _handler: PhantomData<fn() -> H>,
}

impl<W: Write, H: DataHandler> TupleWriter<W, H> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            prev: None,
            written: 0,
            _handler: PhantomData,
        }
    }

    #[inline]
    pub fn write(&mut self, tuple: &Tuple<H>) -> Result<()> {
        if let Some(prev) = self.prev {
            if tuple.kmer < prev {
                return Err(KmrError::OrderingViolation {
                    stream: "output".to_string(),
                    previous: prev.to_string(),
                    next: tuple.kmer.to_string(),
                });
            }
        }
        tuple.encode(&mut self.writer)?;
        self.prev = Some(tuple.kmer);
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Statistics from a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Streams passed to [`Merger::add`].
    pub inputs: usize,
    /// Streams that were empty when added.
    pub empty_inputs: usize,
    pub tuples_read: u64,
    /// Distinct keys emitted.
    pub tuples_written: u64,
}

impl std::fmt::Display for MergeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Inputs: {} ({} empty), Tuples read: {}, Tuples written: {}",
            self.inputs, self.empty_inputs, self.tuples_read, self.tuples_written
        )
    }
}

/// One input stream and its current head tuple.
struct Cursor<'a, H: DataHandler> {
    source: Box<dyn TupleSource<H> + 'a>,
    head: Tuple<H>,
    index: usize,
}

impl<H: DataHandler> Cursor<'_, H> {
    /// Decode the next head. Returns false at end of stream.
    fn advance(&mut self) -> Result<bool> {
        let prev = self.head.kmer;
        if !self.source.next_into(&mut self.head)? {
            return Ok(false);
        }
        if self.head.kmer < prev {
            return Err(KmrError::OrderingViolation {
                stream: format!("input {}", self.index),
                previous: prev.to_string(),
                next: self.head.kmer.to_string(),
            });
        }
        Ok(true)
    }
}

// Reversed so that BinaryHeap pops the smallest key first.
impl<H: DataHandler> Ord for Cursor<'_, H> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .head
            .kmer
            .cmp(&self.head.kmer)
            .then(other.index.cmp(&self.index))
    }
}

impl<H: DataHandler> PartialOrd for Cursor<'_, H> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<H: DataHandler> PartialEq for Cursor<'_, H> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<H: DataHandler> Eq for Cursor<'_, H> {}

/// Merges any number of sorted tuple streams into one.
///
/// Memory use is one cursor per live input plus the tuple being built,
/// independent of input size. Sources are dropped as soon as they are
/// exhausted.
pub struct Merger<'a, H: DataHandler> {
    heap: BinaryHeap<Cursor<'a, H>>,
    stats: MergeStats,
}

impl<H: DataHandler> Default for Merger<'_, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, H: DataHandler> Merger<'a, H> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            stats: MergeStats::default(),
        }
    }

    /// Add an input stream.
    ///
    /// The first tuple is decoded immediately. A stream that is already
    /// exhausted contributes nothing and is not an error.
    pub fn add<S: TupleSource<H> + 'a>(&mut self, source: S) -> Result<()> {
        let index = self.stats.inputs;
        self.stats.inputs += 1;

        let mut cursor = Cursor {
            source: Box::new(source),
            head: Tuple::empty(),
            index,
        };
        if cursor.source.next_into(&mut cursor.head)? {
            self.stats.tuples_read += 1;
            self.heap.push(cursor);
        } else {
            debug!("input {} is empty", index);
            self.stats.empty_inputs += 1;
        }
        Ok(())
    }

    /// Add a byte stream of encoded tuples.
    pub fn add_reader<R: BufRead + 'a>(&mut self, reader: R) -> Result<()> {
        self.add(TupleReader::<R, H>::new(reader))
    }

    /// Number of inputs that still have tuples.
    pub fn live_inputs(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    /// Advance the cursor at the top of the heap, retiring it when its stream
    /// ends. Dropping the `PeekMut` restores heap order.
    fn advance_top(&mut self) -> Result<()> {
        let Some(mut top) = self.heap.peek_mut() else {
            return Ok(());
        };
        if top.advance()? {
            self.stats.tuples_read += 1;
        } else {
            PeekMut::pop(top);
        }
        Ok(())
    }

    /// Write the next merged tuple into `result`.
    ///
    /// Returns `Ok(false)` once every input is exhausted. `result` is a full
    /// copy, so it stays valid while the inputs keep decoding. After an error
    /// every input is dropped and later calls return `Ok(false)`.
    pub fn next_into(&mut self, result: &mut Tuple<H>) -> Result<bool> {
        let merged = self.merge_next(result);
        if merged.is_err() {
            self.heap.clear();
        }
        merged
    }

    fn merge_next(&mut self, result: &mut Tuple<H>) -> Result<bool> {
        match self.heap.peek() {
            Some(top) => result.clone_from(&top.head),
            None => return Ok(false),
        }
        self.advance_top()?;

        while let Some(top) = self.heap.peek() {
            if top.head.kmer != result.kmer {
                break;
            }
            result.add(&top.head);
            self.advance_top()?;
        }
        self.stats.tuples_written += 1;
        Ok(true)
    }

    /// Next merged tuple, or `None` when done.
    pub fn next_tuple(&mut self) -> Result<Option<Tuple<H>>> {
        let mut t = Tuple::empty();
        Ok(self.next_into(&mut t)?.then_some(t))
    }

    /// Drain the merge, encoding every tuple to `w`.
    pub fn dump<W: Write>(&mut self, w: W) -> Result<MergeStats> {
        let mut writer =
            TupleWriter::<_, H>::new(BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, w));
        let mut progress = ProgressTracker::new("Merged k-mers");
        let mut t = Tuple::empty();
        while self.next_into(&mut t)? {
            writer.write(&t)?;
            progress.inc();
        }
        progress.finish();
        writer
            .into_inner()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        Ok(self.stats)
    }
}

impl<H: DataHandler> TupleSource<H> for Merger<'_, H> {
    fn next_into(&mut self, into: &mut Tuple<H>) -> Result<bool> {
        Merger::next_into(self, into)
    }
}

/// Yields merged tuples. After an error the merge is abandoned and the
/// iterator ends.
impl<H: DataHandler> Iterator for Merger<'_, H> {
    type Item = Result<Tuple<H>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tuple().transpose()
    }
}

/// Merge tuple files into `output`.
///
/// The output only appears once the merge has completed; a failed merge
/// leaves nothing behind.
pub fn merge_paths<H, P, Q>(inputs: &[P], output: Q) -> Result<MergeStats>
where
    H: DataHandler,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mut merger = Merger::<H>::new();
    for path in inputs {
        merger.add(TupleReader::<_, H>::open(path)?)?;
    }
    info!(
        "Merging {} {} inputs into {}",
        inputs.len(),
        H::NAME,
        output.as_ref().display()
    );

    let mut out = kio::create(output)?;
    let stats = merger.dump(&mut out)?;
    out.commit()?;
    Ok(stats)
}
