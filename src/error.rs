//! Error types shared by every codec, reader and merger in the crate.

use std::io;
use thiserror::Error;

/// Errors that can occur while reading, writing or merging k-mer streams.
///
/// A clean end of stream is never reported through this type: readers
/// return `Ok(None)` / `Ok(false)` when input ends on a record boundary.
#[derive(Error, Debug)]
pub enum KmrError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a record.
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(String),

    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// A stream yielded a key smaller than the one before it.
    #[error("{stream} is not sorted: k-mer {next} comes after {previous}")]
    OrderingViolation {
        stream: String,
        previous: String,
        next: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, KmrError>;

impl KmrError {
    /// Builds an [`KmrError::UnexpectedEof`] describing what was being read.
    pub fn truncated(what: impl Into<String>) -> Self {
        KmrError::UnexpectedEof(what.into())
    }

    /// Promotes an I/O end-of-file into a truncation error.
    ///
    /// Used wherever a record has already started, so running out of bytes
    /// means the record is incomplete rather than the stream being done.
    pub fn from_io_mid_record(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            KmrError::truncated(what)
        } else {
            KmrError::Io(err)
        }
    }

    /// Returns true for truncated-record errors.
    pub fn is_truncation(&self) -> bool {
        matches!(self, KmrError::UnexpectedEof(_))
    }
}
