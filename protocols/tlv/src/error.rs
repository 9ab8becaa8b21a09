//! Error types for TLV operations

use std::io;
use thiserror::Error;

use crate::list::TlvList;

/// Errors that can occur while encoding, decoding or querying TLV records
#[derive(Error, Debug)]
pub enum TlvError {
    /// The value segment held fewer bytes than its length header promised
    #[error("TLV read error: expected {expected} value bytes, got {actual}")]
    Read { expected: usize, actual: usize },
    /// The sink accepted fewer bytes than required
    #[error("TLV write error: expected to write {expected} bytes, wrote {actual}")]
    Write { expected: usize, actual: usize },
    /// No record with the requested type exists
    #[error("TLV type not found: 0x{0:02x}")]
    TypeNotFound(u8),
    /// The source was exhausted exactly at a record boundary
    #[error("TLV end of stream")]
    EndOfStream,
    /// The length header decoded to a negative value
    #[error("TLV negative length: {0}")]
    NegativeLength(i32),
    /// The length header exceeds the configured maximum
    #[error("TLV value length {length} exceeds maximum {max}")]
    ValueTooLong { length: u32, max: u32 },
    /// Underlying source or sink failure
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TlvError {
    /// Returns true for a clean end of stream, i.e. nothing left before the next type byte.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, TlvError::EndOfStream)
    }
}

/// Result type for TLV operations
pub type TlvResult<T> = Result<T, TlvError>;

/// A list decode that stopped on an error other than a clean end of stream.
///
/// The records decoded before the failure are kept in `list`; callers must inspect `source`
/// before trusting that the list is complete.
#[derive(Error, Debug)]
#[error("TLV list read stopped after {} records: {source}", .list.len())]
pub struct ListReadError {
    pub list: TlvList,
    #[source]
    pub source: TlvError,
}

impl ListReadError {
    /// Splits the error into the partial list and the error that stopped decoding.
    pub fn into_parts(self) -> (TlvList, TlvError) {
        (self.list, self.source)
    }
}
