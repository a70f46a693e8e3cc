//! Merging sorted streams of arbitrary values.
//!
//! The same algorithm as [`crate::merger`], but over any `T` with the ordering
//! and combine step supplied by the caller instead of a [`DataHandler`].
//! Streams are plain iterators of `Result<T>`, so a merger can consume
//! decoded records from any source, including another merger.
//!
//! [`DataHandler`]: crate::tuple::DataHandler
//!
//! # Example
//!
//! ```
//! use kmr::gmerge::Merger;
//! use std::collections::BTreeSet;
//!
//! type Entry = (String, BTreeSet<u32>);
//! let entry = |g: &str, ids: &[u32]| -> kmr::Result<Entry> {
//!     Ok((g.to_string(), ids.iter().copied().collect()))
//! };
//!
//! let mut m = Merger::new(
//!     |a: &Entry, b: &Entry| a.0.cmp(&b.0),
//!     |into: &mut Entry, other: Entry| into.1.extend(other.1),
//! );
//! m.add(vec![entry("abcA", &[1, 2]), entry("dnaK", &[5])]).unwrap();
//! m.add(vec![entry("dnaK", &[3])]).unwrap();
//!
//! let merged: Vec<Entry> = m.collect::<kmr::Result<_>>().unwrap();
//! assert_eq!(merged[1].1.iter().copied().collect::<Vec<_>>(), vec![3, 5]);
//! ```

use crate::error::{KmrError, Result};
use std::cmp::Ordering;
use std::fmt::Debug;

struct Entry<'a, T> {
    value: T,
    stream: Box<dyn Iterator<Item = Result<T>> + 'a>,
    index: usize,
}

/// Merges sorted streams of `T`.
///
/// `compare` orders values by key; values that compare equal are folded
/// together with `merge`, in the order their streams were added.
pub struct Merger<'a, T, C, M>
where
    C: Fn(&T, &T) -> Ordering,
    M: FnMut(&mut T, T),
{
    // Binary min-heap; the comparator lives outside the entries.
    heap: Vec<Entry<'a, T>>,
    compare: C,
    merge: M,
    added: usize,
}

impl<'a, T, C, M> Merger<'a, T, C, M>
where
    T: Debug,
    C: Fn(&T, &T) -> Ordering,
    M: FnMut(&mut T, T),
{
    pub fn new(compare: C, merge: M) -> Self {
        Self {
            heap: Vec::new(),
            compare,
            merge,
            added: 0,
        }
    }

    /// Add a stream, pulling its first value.
    ///
    /// An empty stream is ignored. An error from the first pull is returned.
    pub fn add<I>(&mut self, stream: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'a,
    {
        let index = self.added;
        self.added += 1;

        let mut stream = stream.into_iter();
        let Some(first) = stream.next() else {
            return Ok(());
        };
        self.heap.push(Entry {
            value: first?,
            stream: Box::new(stream),
            index,
        });
        self.sift_up(self.heap.len() - 1);
        Ok(())
    }

    /// Number of streams that still have values.
    pub fn live_inputs(&self) -> usize {
        self.heap.len()
    }

    /// The next merged value, or `None` once every stream is exhausted.
    pub fn next_value(&mut self) -> Result<Option<T>> {
        if self.heap.is_empty() {
            return Ok(None);
        }
        let mut cur = self.advance_top()?;
        while let Some(top) = self.heap.first() {
            if (self.compare)(&cur, &top.value) != Ordering::Equal {
                break;
            }
            let other = self.advance_top()?;
            (self.merge)(&mut cur, other);
        }
        Ok(Some(cur))
    }

    /// Take the value at the top of the heap and replace it with the next one
    /// from the same stream.
    fn advance_top(&mut self) -> Result<T> {
        let top = &mut self.heap[0];
        match top.stream.next() {
            Some(Ok(next)) => {
                if (self.compare)(&next, &top.value) == Ordering::Less {
                    return Err(KmrError::OrderingViolation {
                        stream: format!("input {}", top.index),
                        previous: format!("{:?}", top.value),
                        next: format!("{:?}", next),
                    });
                }
                let old = std::mem::replace(&mut top.value, next);
                self.sift_down(0);
                Ok(old)
            }
            Some(Err(e)) => Err(e),
            None => {
                let entry = self.heap.swap_remove(0);
                self.sift_down(0);
                Ok(entry.value)
            }
        }
    }

    #[inline]
    fn less(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.heap[a], &self.heap[b]);
        match (self.compare)(&a.value, &b.value) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => a.index < b.index,
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(i, parent) {
                break;
            }
            self.heap.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= n {
                break;
            }
            let right = left + 1;
            let child = if right < n && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, i) {
                break;
            }
            self.heap.swap(i, child);
            i = child;
        }
    }
}

/// After an error the merge is abandoned and the iterator ends.
impl<T, C, M> Iterator for Merger<'_, T, C, M>
where
    T: Debug,
    C: Fn(&T, &T) -> Ordering,
    M: FnMut(&mut T, T),
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_value() {
            Ok(v) => v.map(Ok),
            Err(e) => {
                self.heap.clear();
                Some(Err(e))
            }
        }
    }
}
