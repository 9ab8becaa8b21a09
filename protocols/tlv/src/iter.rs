//! TLV iterator for parsing byte buffers without copying.

use crate::{CodecConfig, TlvError, TlvRef, TlvResult};

/// Iterator over TLV records in a byte buffer.
///
/// Lazily decodes records as the iterator is consumed. Ends cleanly at the end of the buffer;
/// on the first decode error it yields that error once and then stops.
pub struct TlvIter<'a> {
    data: &'a [u8],
    offset: usize,
    config: CodecConfig,
}

impl<'a> TlvIter<'a> {
    /// Creates a new TLV iterator over the provided data.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, CodecConfig::default())
    }

    pub fn with_config(data: &'a [u8], config: CodecConfig) -> Self {
        Self {
            data,
            offset: 0,
            config,
        }
    }

    /// Bytes not yet consumed by the iterator.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = TlvResult<TlvRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let data: &'a [u8] = self.data;
        match TlvRef::decode_with(&data[self.offset..], &self.config) {
            Ok((tlv, consumed)) => {
                self.offset += consumed;
                Some(Ok(tlv))
            }
            Err(TlvError::EndOfStream) => None,
            Err(e) => {
                // Stop iteration on error by advancing to end
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}
