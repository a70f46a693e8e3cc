//! Presence payload: the samples in which a k-mer appears.
//!
//! On the wire a sample list is its length followed by the delta-coded
//! indices as zig-zag varints. Decoding insists on strictly increasing
//! indices; a list with repeats or inversions is reported as corrupt.
//!
//! Merging concatenates lists without deduplication. When the same sample
//! contributes a key from two shards the merged list carries the index twice,
//! and reading it back fails validation. Producers that can overlap must
//! deduplicate before encoding.

use super::{DataHandler, Tuple};
use crate::delta::to_diffs;
use crate::error::{KmrError, Result};
use crate::varint::{expect_len, expect_varint, write_uvarint, write_varint};
use std::io::{BufRead, Write};

/// Upper bound on samples reserved up front when decoding; longer lists grow
/// as they are read.
const MAX_RESERVE: usize = 4096;

/// Sample indices that contain a k-mer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasData {
    pub samples: Vec<u64>,
    /// Sort the samples before encoding. Parallel producers emit samples in
    /// arbitrary order and rely on this.
    pub sort_on_encode: bool,
}

impl Default for HasData {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            sort_on_encode: true,
        }
    }
}

impl HasData {
    pub fn from_samples(samples: Vec<u64>) -> Self {
        Self {
            samples,
            ..Default::default()
        }
    }

    /// Check that the samples are strictly increasing.
    pub fn validate(&self) -> Result<()> {
        validate_samples(&self.samples)
    }
}

fn validate_samples(samples: &[u64]) -> Result<()> {
    if let Some(i) = samples.windows(2).position(|w| w[0] >= w[1]) {
        return Err(KmrError::CorruptRecord(format!(
            "samples are not strictly increasing: {} followed by {}",
            samples[i],
            samples[i + 1]
        )));
    }
    Ok(())
}

/// Handler for [`HasData`]. Merging concatenates sample lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasHandler;

/// A k-mer and the samples that have it.
pub type HasTuple = Tuple<HasHandler>;

impl DataHandler for HasHandler {
    type Data = HasData;

    const NAME: &'static str = "has";

    fn encode<W: Write + ?Sized>(data: &HasData, w: &mut W) -> Result<()> {
        let mut diffs = Vec::with_capacity(data.samples.len());
        for &s in &data.samples {
            let s = i64::try_from(s).map_err(|_| {
                KmrError::InvalidInput(format!("sample index {} is too large", s))
            })?;
            diffs.push(s);
        }
        if data.sort_on_encode {
            diffs.sort_unstable();
        }
        to_diffs(&mut diffs);

        write_uvarint(w, diffs.len() as u64)?;
        for &d in &diffs {
            write_varint(w, d)?;
        }
        Ok(())
    }

    fn decode<R: BufRead + ?Sized>(data: &mut HasData, r: &mut R) -> Result<()> {
        let n = expect_len(r, "sample count")?;
        data.samples.clear();
        data.samples.reserve(n.min(MAX_RESERVE));

        // Prefix sum of the deltas, straight into the reused buffer.
        let mut cur: i64 = 0;
        for _ in 0..n {
            cur = cur.wrapping_add(expect_varint(r, "sample index")?);
            let v = u64::try_from(cur).map_err(|_| {
                KmrError::CorruptRecord(format!("negative sample index {}", cur))
            })?;
            data.samples.push(v);
        }
        validate_samples(&data.samples)
    }

    /// # Panics
    ///
    /// Panics if the two payloads disagree on `sort_on_encode`.
    fn merge(into: &mut HasData, other: &HasData) {
        if into.sort_on_encode != other.sort_on_encode {
            panic!(
                "inputs disagree on sort_on_encode: {}, {}",
                into.sort_on_encode, other.sort_on_encode
            );
        }
        into.samples.extend_from_slice(&other.samples);
    }

    fn write_text(data: &HasData, out: &mut Vec<u8>) {
        let mut buf = itoa::Buffer::new();
        for (i, &s) in data.samples.iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            out.extend_from_slice(buf.format(s).as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(data: &HasData) -> Result<HasData> {
        let mut buf = Vec::new();
        HasHandler::encode(data, &mut buf)?;
        let mut got = HasData::default();
        HasHandler::decode(&mut got, &mut Cursor::new(buf))?;
        Ok(got)
    }

    #[test]
    fn test_encode_layout() {
        let mut buf = Vec::new();
        HasHandler::encode(&HasData::from_samples(vec![3, 4, 10]), &mut buf).unwrap();
        // count, then zig-zag deltas 3, 1, 6
        assert_eq!(buf, vec![3, 6, 2, 12]);
    }

    #[test]
    fn test_round_trip() {
        let data = HasData::from_samples(vec![0, 1, 5, 1000, 1_000_000]);
        assert_eq!(round_trip(&data).unwrap(), data);
    }

    #[test]
    fn test_empty_round_trip() {
        let data = HasData::default();
        assert_eq!(round_trip(&data).unwrap(), data);
    }

    #[test]
    fn test_sorts_on_encode() {
        let data = HasData::from_samples(vec![9, 2, 5]);
        assert_eq!(round_trip(&data).unwrap().samples, vec![2, 5, 9]);
        // The caller's payload is left untouched.
        assert_eq!(data.samples, vec![9, 2, 5]);
    }

    #[test]
    fn test_unsorted_without_sort_flag_fails_decode() {
        let data = HasData {
            samples: vec![9, 2, 5],
            sort_on_encode: false,
        };
        let err = round_trip(&data).unwrap_err();
        assert!(matches!(err, KmrError::CorruptRecord(_)));
    }

    #[test]
    fn test_duplicates_fail_decode() {
        let data = HasData::from_samples(vec![1, 4, 4]);
        let err = round_trip(&data).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn test_merge_concatenates() {
        let mut a = HasData::from_samples(vec![1, 3]);
        HasHandler::merge(&mut a, &HasData::from_samples(vec![2, 5]));
        assert_eq!(a.samples, vec![1, 3, 2, 5]);
    }

    #[test]
    #[should_panic(expected = "sort_on_encode")]
    fn test_merge_disagreeing_flags_panics() {
        let mut a = HasData::from_samples(vec![1]);
        let b = HasData {
            samples: vec![2],
            sort_on_encode: false,
        };
        HasHandler::merge(&mut a, &b);
    }

    #[test]
    fn test_decode_reuses_buffer() {
        let mut buf = Vec::new();
        HasHandler::encode(&HasData::from_samples(vec![4]), &mut buf).unwrap();
        let mut data = HasData::from_samples(vec![1, 2, 3]);
        let before = data.samples.as_ptr();
        HasHandler::decode(&mut data, &mut Cursor::new(buf)).unwrap();
        assert_eq!(data.samples, vec![4]);
        assert_eq!(data.samples.as_ptr(), before);
    }

    #[test]
    fn test_huge_sample_count_is_truncation() {
        // Key, then a sample count of 2^30 and nothing else.
        let buf = vec![8, 0, 0, 0, 0, 0, 0, 0, 1, 0x80, 0x80, 0x80, 0x80, 0x04];
        let mut t = HasTuple::empty();
        let err = t.decode(&mut Cursor::new(buf)).unwrap_err();
        assert!(err.is_truncation(), "{}", err);
        assert!(t.data.samples.capacity() <= MAX_RESERVE);
    }

    #[test]
    fn test_truncated_samples() {
        let buf = vec![3, 2, 2];
        let mut data = HasData::default();
        let err = HasHandler::decode(&mut data, &mut Cursor::new(buf)).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_validate() {
        assert!(HasData::from_samples(vec![1, 2, 3]).validate().is_ok());
        assert!(HasData::from_samples(vec![1, 1]).validate().is_err());
        assert!(HasData::from_samples(vec![]).validate().is_ok());
    }

    #[test]
    fn test_write_text() {
        let mut out = Vec::new();
        HasHandler::write_text(&HasData::from_samples(vec![1, 20, 300]), &mut out);
        assert_eq!(out, b"1,20,300");
    }
}
