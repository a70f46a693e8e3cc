//! Condensed key dumps.
//!
//! Consecutive keys in a sorted dump tend to share long prefixes, so each key
//! is written as only the suffix that differs from the previous key:
//!
//! ```text
//! [varint suffix length][suffix bytes]
//! ```
//!
//! The position of the first differing byte is implied by the suffix length.
//! Both ends start from an all-zero previous key, so the first record is coded
//! against [`Kmer::MIN`]. No key compares below that one, so a stream that
//! starts with any key decodes correctly.
//!
//! The format does not check ordering itself. Unsorted input still decodes,
//! it just stops being compact.

use crate::error::{KmrError, Result};
use crate::kmer::{Kmer, KMER_BYTES};
use crate::varint::{read_exact_in_record, read_uvarint, write_bytes};
use std::io::{BufRead, Write};

/// Writes keys in condensed form.
pub struct KeyWriter<W: Write> {
    writer: W,
    prev: Kmer,
    written: u64,
}

impl<W: Write> KeyWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            prev: Kmer::MIN,
            written: 0,
        }
    }

    /// Write one key as its suffix relative to the previously written key.
    #[inline]
    pub fn write(&mut self, kmer: &Kmer) -> Result<()> {
        let i = self.prev.common_prefix(kmer);
        write_bytes(&mut self.writer, &kmer.0[i..])?;
        self.prev = *kmer;
        self.written += 1;
        Ok(())
    }

    /// Number of keys written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Reads keys written by [`KeyWriter`].
pub struct KeyReader<R: BufRead> {
    reader: R,
    cur: Kmer,
}

impl<R: BufRead> KeyReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            cur: Kmer::MIN,
        }
    }

    /// Read the next key, or `None` at a clean end of stream.
    ///
    /// The last `n` bytes of the retained key are overwritten with the
    /// suffix just read; the prefix carries over from the previous key.
    pub fn read(&mut self) -> Result<Option<Kmer>> {
        let n = match read_uvarint(&mut self.reader)? {
            Some(n) => n,
            None => return Ok(None),
        };
        if n > KMER_BYTES as u64 {
            return Err(KmrError::CorruptRecord(format!(
                "bad k-mer piece length: {}",
                n
            )));
        }
        let start = KMER_BYTES - n as usize;
        read_exact_in_record(&mut self.reader, &mut self.cur.0[start..], "k-mer suffix")?;
        Ok(Some(self.cur))
    }
}

impl<R: BufRead> Iterator for KeyReader<R> {
    type Item = Result<Kmer>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_all(keys: &[Kmer]) -> Vec<u8> {
        let mut w = KeyWriter::new(Vec::new());
        for k in keys {
            w.write(k).unwrap();
        }
        assert_eq!(w.written(), keys.len() as u64);
        w.into_inner().unwrap()
    }

    fn read_all(buf: Vec<u8>) -> Vec<Kmer> {
        KeyReader::new(Cursor::new(buf))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_empty() {
        let buf = write_all(&[]);
        assert!(buf.is_empty());
        assert!(read_all(buf).is_empty());
    }

    #[test]
    fn test_single() {
        let keys = [Kmer([9, 8, 7, 6, 5, 4, 3, 2])];
        let buf = write_all(&keys);
        assert_eq!(buf.len(), 1 + KMER_BYTES);
        assert_eq!(read_all(buf), keys);
    }

    #[test]
    fn test_shared_prefixes_are_condensed() {
        let keys = [
            Kmer([1, 2, 3, 4, 5, 6, 7, 8]),
            Kmer([1, 2, 3, 4, 5, 6, 7, 9]),
            Kmer([1, 2, 3, 4, 5, 6, 8, 0]),
            Kmer([1, 2, 4, 0, 0, 0, 0, 0]),
        ];
        let buf = write_all(&keys);
        assert_eq!(buf.len(), (1 + 8) + (1 + 1) + (1 + 2) + (1 + 6));
        assert_eq!(read_all(buf), keys);
    }

    #[test]
    fn test_first_key_coded_against_zero() {
        let keys = [Kmer([0, 0, 0, 0, 0, 0, 1, 2])];
        let buf = write_all(&keys);
        assert_eq!(buf, vec![2, 1, 2]);
        assert_eq!(read_all(buf), keys);
    }

    #[test]
    fn test_repeated_key() {
        let k = Kmer([5; KMER_BYTES]);
        let buf = write_all(&[k, k]);
        assert_eq!(buf.len(), 1 + KMER_BYTES + 1);
        assert_eq!(read_all(buf), vec![k, k]);
    }

    #[test]
    fn test_long_sorted_run() {
        let keys: Vec<Kmer> = (0u64..5000)
            .map(|i| Kmer((i * 7919).to_be_bytes()))
            .collect();
        let buf = write_all(&keys);
        assert!(buf.len() < keys.len() * (1 + KMER_BYTES));
        assert_eq!(read_all(buf), keys);
    }

    #[test]
    fn test_bad_piece_length() {
        let mut r = KeyReader::new(Cursor::new(vec![9u8]));
        let err = r.read().unwrap_err();
        assert!(err.to_string().contains("bad k-mer piece length"));
    }

    #[test]
    fn test_truncated_suffix() {
        let mut r = KeyReader::new(Cursor::new(vec![3u8, 1]));
        assert!(r.read().unwrap_err().is_truncation());
    }
}
