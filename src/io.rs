//! File opening and creation for tuple streams.
//!
//! Paths ending in `.gz` are transparently decompressed on read and
//! compressed on write; `-` stands for stdin/stdout. Everything downstream
//! only sees `BufRead`/`Write`, so codecs and mergers stay agnostic of
//! compression.
//!
//! Outputs are written to a temporary file next to the destination and only
//! renamed into place by [`AtomicOutput::commit`]. A merge that aborts halfway
//! therefore never leaves a truncated file that looks like a valid result.

use crate::error::Result;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default input buffer size (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Whether a path names gzip-compressed data.
#[inline]
pub fn is_gzip<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

#[inline]
fn is_stdio<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().as_os_str() == "-"
}

/// Open a file for buffered reading, decompressing `.gz` files.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    if is_stdio(path) {
        return Ok(Box::new(BufReader::with_capacity(
            DEFAULT_INPUT_BUFFER,
            io::stdin(),
        )));
    }
    let file = File::open(path)?;
    if is_gzip(path) {
        let decoder = MultiGzDecoder::new(BufReader::new(file));
        Ok(Box::new(BufReader::with_capacity(DEFAULT_INPUT_BUFFER, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(DEFAULT_INPUT_BUFFER, file)))
    }
}

enum Sink {
    Stdout(BufWriter<io::Stdout>),
    Plain(BufWriter<NamedTempFile>),
    Gzip(GzEncoder<BufWriter<NamedTempFile>>),
}

/// An output file that only appears at its destination once committed.
///
/// Dropping it without calling [`commit`](Self::commit) deletes the
/// temporary file.
pub struct AtomicOutput {
    path: PathBuf,
    sink: Sink,
}

/// Create an output file, compressing if the path ends in `.gz`.
pub fn create<P: AsRef<Path>>(path: P) -> Result<AtomicOutput> {
    let path = path.as_ref();
    if is_stdio(path) {
        return Ok(AtomicOutput {
            path: path.to_path_buf(),
            sink: Sink::Stdout(BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, io::stdout())),
        });
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".kmr-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    let buffered = BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, tmp);
    let sink = if is_gzip(path) {
        Sink::Gzip(GzEncoder::new(buffered, Compression::fast()))
    } else {
        Sink::Plain(buffered)
    };
    Ok(AtomicOutput {
        path: path.to_path_buf(),
        sink,
    })
}

impl AtomicOutput {
    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush everything and move the file into place.
    pub fn commit(self) -> Result<()> {
        let tmp = match self.sink {
            Sink::Stdout(mut w) => {
                w.flush()?;
                return Ok(());
            }
            Sink::Plain(w) => w.into_inner().map_err(|e| e.into_error())?,
            Sink::Gzip(enc) => enc.finish()?.into_inner().map_err(|e| e.into_error())?,
        };
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Write for AtomicOutput {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Stdout(w) => w.write(buf),
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stdout(w) => w.write_all(buf),
            Sink::Plain(w) => w.write_all(buf),
            Sink::Gzip(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stdout(w) => w.flush(),
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}
