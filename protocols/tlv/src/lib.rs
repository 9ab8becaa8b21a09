//! # TLV Codec
//!
//! Encoding and decoding of Type-Length-Value records, and ordered lists of them.
//!
//! Each record on the wire is a 1-byte type, a 4-byte big-endian signed length and `length`
//! value bytes. Lists are plain concatenations of records terminated only by the end of the
//! stream.
//!
//! ## Responsibilities
//! - **Object codec**: the [`Tlv`] record abstraction, [`TlvObject`] and the streaming
//!   [`read_tlv`] / [`write_tlv`] primitives.
//! - **Record list**: [`TlvList`], an insertion-ordered collection with type lookup, bulk
//!   removal and whole-list stream encoding via [`read_list`].
//! - **Zero-copy parsing**: [`TlvIter`] over borrowed buffers.
//!
//! Values are opaque. A value may hold further encoded records; decoding them is up to the
//! caller.
//!
//! ```
//! use tlv_codec::{read_list, Tlv, TlvList};
//!
//! let mut list = TlvList::new();
//! list.add(0x01, b"hello");
//! list.add(0x02, &[]);
//!
//! let mut wire = Vec::new();
//! list.write(&mut wire).unwrap();
//!
//! let decoded = read_list(&mut wire.as_slice()).unwrap();
//! assert_eq!(decoded.get(0x01).unwrap().value(), b"hello");
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod iter;
pub mod list;

pub use codec::{
    from_bytes, new_tlv, read_tlv, read_tlv_with, tlv_equal, to_bytes, write_tlv, Tlv, TlvObject,
    TlvRef, TLV_HEADER_SIZE,
};
pub use config::CodecConfig;
pub use error::{ListReadError, TlvError, TlvResult};
pub use iter::TlvIter;
pub use list::{read_list, read_list_with, TlvList};
