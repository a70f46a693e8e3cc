//! Count payload: how many times a k-mer was seen.

use super::{DataHandler, Tuple};
use crate::error::Result;
use crate::varint::{expect_uvarint, write_uvarint};
use std::io::{BufRead, Write};

/// Appearance count of a k-mer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountData {
    pub count: u64,
}

/// Handler for [`CountData`]. Merging sums the counts, saturating on overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountHandler;

/// A k-mer and its count.
pub type CountTuple = Tuple<CountHandler>;

impl DataHandler for CountHandler {
    type Data = CountData;

    const NAME: &'static str = "cnt";

    #[inline]
    fn encode<W: Write + ?Sized>(data: &CountData, w: &mut W) -> Result<()> {
        write_uvarint(w, data.count)
    }

    #[inline]
    fn decode<R: BufRead + ?Sized>(data: &mut CountData, r: &mut R) -> Result<()> {
        data.count = expect_uvarint(r, "count")?;
        Ok(())
    }

    /// Saturates at `u64::MAX`.
    #[inline]
    fn merge(into: &mut CountData, other: &CountData) {
        into.count = into.count.saturating_add(other.count);
    }

    fn write_text(data: &CountData, out: &mut Vec<u8>) {
        let mut buf = itoa::Buffer::new();
        out.extend_from_slice(buf.format(data.count).as_bytes());
    }
}
