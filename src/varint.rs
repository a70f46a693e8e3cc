//! Base-128 varints and length-prefixed byte strings.
//!
//! This is the wire format for every record in the crate. Unsigned values are
//! written little-endian, 7 payload bits per byte, with the high bit marking
//! that another byte follows. Zero encodes as a single `0x00` byte.
//!
//! Readers distinguish a stream that ends cleanly *before* a value from one
//! that ends *inside* a value: the first returns `Ok(None)`, the second
//! [`KmrError::UnexpectedEof`]. Mergers rely on this to retire exhausted inputs
//! while still failing on truncated records.

use crate::error::{KmrError, Result};
use std::io::{self, BufRead, Read, Write};

/// Maximum number of bytes a 64-bit varint can occupy.
pub const MAX_VARINT_LEN: usize = 10;

/// Upper bound for length prefixes of byte strings, to reject garbage lengths
/// before allocating.
pub const MAX_BYTES_LEN: u64 = 1 << 30;

/// Write `x` as an unsigned varint.
#[inline]
pub fn write_uvarint<W: Write + ?Sized>(w: &mut W, mut x: u64) -> Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut i = 0;
    while x >= 0x80 {
        buf[i] = (x as u8) | 0x80;
        x >>= 7;
        i += 1;
    }
    buf[i] = x as u8;
    w.write_all(&buf[..=i])?;
    Ok(())
}

/// Read one byte, or `None` at end of stream.
#[inline]
fn read_byte<R: BufRead + ?Sized>(r: &mut R) -> io::Result<Option<u8>> {
    let byte = loop {
        match r.fill_buf() {
            Ok(buf) => break buf.first().copied(),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    };
    if byte.is_some() {
        r.consume(1);
    }
    Ok(byte)
}

/// Read an unsigned varint.
///
/// Returns `Ok(None)` if the stream is exhausted before the first byte.
/// Running out of input after a continuation byte is a truncation error.
pub fn read_uvarint<R: BufRead + ?Sized>(r: &mut R) -> Result<Option<u64>> {
    let mut x: u64 = 0;
    let mut shift = 0u32;
    for i in 0..MAX_VARINT_LEN {
        let b = match read_byte(r)? {
            Some(b) => b,
            None if i == 0 => return Ok(None),
            None => return Err(KmrError::truncated("varint")),
        };
        if i == MAX_VARINT_LEN - 1 && b > 1 {
            return Err(KmrError::CorruptRecord(
                "varint overflows 64 bits".to_string(),
            ));
        }
        x |= u64::from(b & 0x7f) << shift;
        if b & 0x80 == 0 {
            return Ok(Some(x));
        }
        shift += 7;
    }
    Err(KmrError::CorruptRecord(format!(
        "varint longer than {} bytes",
        MAX_VARINT_LEN
    )))
}

/// Read an unsigned varint that must be present.
///
/// Used for fields inside a record, where end of stream means truncation.
#[inline]
pub fn expect_uvarint<R: BufRead + ?Sized>(r: &mut R, what: &str) -> Result<u64> {
    read_uvarint(r)?.ok_or_else(|| KmrError::truncated(what))
}

/// Zig-zag map a signed value so small magnitudes get short encodings.
#[inline]
pub fn zigzag(x: i64) -> u64 {
    ((x << 1) ^ (x >> 63)) as u64
}

/// Inverse of [`zigzag`].
#[inline]
pub fn unzigzag(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Write a signed value as a zig-zag varint.
#[inline]
pub fn write_varint<W: Write + ?Sized>(w: &mut W, x: i64) -> Result<()> {
    write_uvarint(w, zigzag(x))
}

/// Read a zig-zag varint that must be present.
#[inline]
pub fn expect_varint<R: BufRead + ?Sized>(r: &mut R, what: &str) -> Result<i64> {
    expect_uvarint(r, what).map(unzigzag)
}

/// Read a length prefix and convert it to `usize`, rejecting absurd values.
pub fn expect_len<R: BufRead + ?Sized>(r: &mut R, what: &str) -> Result<usize> {
    let n = expect_uvarint(r, what)?;
    if n > MAX_BYTES_LEN {
        return Err(KmrError::CorruptRecord(format!(
            "{} length {} is too large",
            what, n
        )));
    }
    Ok(n as usize)
}

/// Write a varint length followed by the raw bytes.
#[inline]
pub fn write_bytes<W: Write + ?Sized>(w: &mut W, b: &[u8]) -> Result<()> {
    write_uvarint(w, b.len() as u64)?;
    w.write_all(b)?;
    Ok(())
}

/// Read `n` bytes that belong to a record already in progress.
#[inline]
pub fn read_exact_in_record<R: BufRead + ?Sized>(
    r: &mut R,
    buf: &mut [u8],
    what: &str,
) -> Result<()> {
    r.read_exact(buf)
        .map_err(|e| KmrError::from_io_mid_record(e, what))
}

/// Read the `n` bytes of a record body into `buf`, replacing its contents.
///
/// The buffer grows as data arrives, so a corrupt length costs no more
/// memory than the input actually holds.
fn read_body<R: BufRead + ?Sized>(r: &mut R, n: u64, buf: &mut Vec<u8>, what: &str) -> Result<()> {
    buf.clear();
    let got = (&mut *r).take(n).read_to_end(buf)?;
    if (got as u64) < n {
        return Err(KmrError::truncated(what));
    }
    Ok(())
}

/// Read a length-prefixed byte string into `buf`, replacing its contents.
///
/// Returns `Ok(false)` if the stream was exhausted before the length prefix.
/// A zero length leaves `buf` empty.
pub fn read_bytes_into<R: BufRead + ?Sized>(r: &mut R, buf: &mut Vec<u8>) -> Result<bool> {
    let n = match read_uvarint(r)? {
        Some(n) => n,
        None => return Ok(false),
    };
    if n > MAX_BYTES_LEN {
        return Err(KmrError::CorruptRecord(format!(
            "byte string length {} is too large",
            n
        )));
    }
    read_body(r, n, buf, "byte string")?;
    Ok(true)
}

/// Write a length-prefixed UTF-8 string.
#[inline]
pub fn write_str<W: Write + ?Sized>(w: &mut W, s: &str) -> Result<()> {
    write_bytes(w, s.as_bytes())
}

/// Read a length-prefixed UTF-8 string that must be present.
pub fn expect_string<R: BufRead + ?Sized>(r: &mut R, what: &str) -> Result<String> {
    let n = expect_len(r, what)?;
    let mut buf = Vec::new();
    read_body(r, n as u64, &mut buf, what)?;
    String::from_utf8(buf)
        .map_err(|_| KmrError::CorruptRecord(format!("{} is not valid UTF-8", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(x: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_uvarint(&mut buf, x).unwrap();
        buf
    }

    #[test]
    fn test_zero_is_single_byte() {
        assert_eq!(encode(0), vec![0x00]);
    }

    #[test]
    fn test_small_values() {
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(127), vec![0x7f]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(300), vec![0xac, 0x02]);
    }

    #[test]
    fn test_round_trip_edges() {
        let values = [
            0u64,
            1,
            127,
            128,
            16_383,
            16_384,
            u32::MAX as u64,
            1 << 62,
            (1 << 63) - 1,
            1 << 63,
            u64::MAX,
        ];
        for &x in &values {
            let buf = encode(x);
            let mut r = Cursor::new(buf);
            assert_eq!(read_uvarint(&mut r).unwrap(), Some(x), "value {}", x);
            assert_eq!(read_uvarint(&mut r).unwrap(), None);
        }
    }

    #[test]
    fn test_large_values_take_nine_and_ten_bytes() {
        assert_eq!(encode((1 << 63) - 1).len(), 9);
        assert_eq!(encode(1 << 63).len(), 10);
        assert_eq!(encode(u64::MAX).len(), 10);
    }

    #[test]
    fn test_clean_eof_is_none() {
        let mut r = Cursor::new(Vec::<u8>::new());
        assert!(read_uvarint(&mut r).unwrap().is_none());
    }

    #[test]
    fn test_truncated_varint_is_unexpected_eof() {
        let mut r = Cursor::new(vec![0x80, 0x80]);
        let err = read_uvarint(&mut r).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_overflowing_varint_is_corrupt() {
        let mut r = Cursor::new(vec![0xff; 11]);
        assert!(matches!(
            read_uvarint(&mut r),
            Err(KmrError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_expect_uvarint_on_empty_input() {
        let mut r = Cursor::new(Vec::<u8>::new());
        assert!(expect_uvarint(&mut r, "count").unwrap_err().is_truncation());
    }

    #[test]
    fn test_zigzag() {
        for x in [0i64, 1, -1, 2, -2, 63, -64, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag(zigzag(x)), x);
        }
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut buf = Vec::new();
        write_bytes(&mut buf, b"ACGT").unwrap();
        write_bytes(&mut buf, b"").unwrap();
        assert_eq!(buf, vec![4, b'A', b'C', b'G', b'T', 0]);

        let mut r = Cursor::new(buf);
        let mut out = Vec::new();
        assert!(read_bytes_into(&mut r, &mut out).unwrap());
        assert_eq!(out, b"ACGT");
        assert!(read_bytes_into(&mut r, &mut out).unwrap());
        assert!(out.is_empty());
        assert!(!read_bytes_into(&mut r, &mut out).unwrap());
    }

    #[test]
    fn test_truncated_bytes() {
        let mut r = Cursor::new(vec![5, b'A', b'C']);
        let mut out = Vec::new();
        assert!(read_bytes_into(&mut r, &mut out)
            .unwrap_err()
            .is_truncation());
    }

    #[test]
    fn test_huge_length_with_little_data_is_truncation() {
        // Claims just under 1 GiB, carries two bytes.
        let mut buf = Vec::new();
        write_uvarint(&mut buf, MAX_BYTES_LEN - 1).unwrap();
        buf.extend_from_slice(b"AC");
        let mut out = Vec::new();
        let err = read_bytes_into(&mut Cursor::new(buf.clone()), &mut out).unwrap_err();
        assert!(err.is_truncation());
        assert!(out.capacity() < 1 << 20);
        assert!(expect_string(&mut Cursor::new(buf), "gene")
            .unwrap_err()
            .is_truncation());
    }

    #[test]
    fn test_string_round_trip() {
        let mut buf = Vec::new();
        write_str(&mut buf, "geneA").unwrap();
        let mut r = Cursor::new(buf);
        assert_eq!(expect_string(&mut r, "gene").unwrap(), "geneA");
    }
}
