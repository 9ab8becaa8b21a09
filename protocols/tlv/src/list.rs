//! Ordered list of TLV records.

use std::{
    io::{Read, Write},
    slice,
    sync::Arc,
};

use tracing::debug;

use crate::{
    codec::{read_tlv_with, tlv_equal, write_tlv},
    CodecConfig, ListReadError, Tlv, TlvError, TlvObject, TlvResult,
};

/// An ordered, mutable collection of TLV records.
///
/// Insertion order is preserved across every mutation. Records of the same type, and even
/// identical records, may appear any number of times. Records are held behind `Arc` so that
/// [`TlvList::add_object`] shares the caller's record instead of copying it.
#[derive(Debug, Clone, Default)]
pub struct TlvList {
    objects: Vec<Arc<dyn Tlv>>,
}

impl TlvList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    /// Decodes a list from an in-memory buffer, with [`read_list`] semantics.
    pub fn from_slice(data: &[u8]) -> Result<Self, ListReadError> {
        let mut reader = data;
        read_list(&mut reader)
    }

    /// Number of records in the list.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the earliest-inserted record of the given type.
    pub fn get(&self, tlv_type: u8) -> TlvResult<Arc<dyn Tlv>> {
        self.objects
            .iter()
            .find(|tlv| tlv.tlv_type() == tlv_type)
            .cloned()
            .ok_or(TlvError::TypeNotFound(tlv_type))
    }

    /// Returns every record of the given type in insertion order; empty if none match.
    pub fn get_all(&self, tlv_type: u8) -> Vec<Arc<dyn Tlv>> {
        self.objects
            .iter()
            .filter(|tlv| tlv.tlv_type() == tlv_type)
            .cloned()
            .collect()
    }

    /// Removes every record of the given type and returns how many were removed.
    pub fn remove(&mut self, tlv_type: u8) -> usize {
        self.remove_where(|tlv| tlv.tlv_type() == tlv_type)
    }

    /// Removes every record structurally equal to `obj` (type, length and value) and returns how
    /// many were removed.
    pub fn remove_object(&mut self, obj: &dyn Tlv) -> usize {
        self.remove_where(|tlv| tlv_equal(Some(tlv), Some(obj)))
    }

    /// Builds a record from `tlv_type` and a copy of `value`, and appends it.
    pub fn add(&mut self, tlv_type: u8, value: &[u8]) {
        self.objects.push(Arc::new(TlvObject::new(tlv_type, value)));
    }

    /// Appends an existing record without copying it.
    pub fn add_object(&mut self, obj: Arc<dyn Tlv>) {
        self.objects.push(obj);
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Iterates over the records in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, Arc<dyn Tlv>> {
        self.objects.iter()
    }

    /// Writes every record to `sink` in order.
    ///
    /// Stops at the first failing record; whatever was already written stays in the sink.
    pub fn write<W: Write + ?Sized>(&self, sink: &mut W) -> TlvResult<()> {
        for tlv in &self.objects {
            write_tlv(&**tlv, sink)?;
        }
        Ok(())
    }

    /// Encodes the whole list into a freshly allocated buffer.
    pub fn to_bytes(&self) -> TlvResult<Vec<u8>> {
        let size = self.objects.iter().map(|tlv| tlv.encoded_size()).sum();
        let mut bytes = Vec::with_capacity(size);
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    fn remove_where<F>(&mut self, mut matches: F) -> usize
    where
        F: FnMut(&dyn Tlv) -> bool,
    {
        let before = self.objects.len();
        self.objects.retain(|tlv| !matches(&**tlv));
        before - self.objects.len()
    }
}

impl<'a> IntoIterator for &'a TlvList {
    type Item = &'a Arc<dyn Tlv>;
    type IntoIter = slice::Iter<'a, Arc<dyn Tlv>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<TlvObject> for TlvList {
    fn from_iter<I: IntoIterator<Item = TlvObject>>(iter: I) -> Self {
        let mut list = TlvList::new();
        list.extend(iter);
        list
    }
}

impl Extend<TlvObject> for TlvList {
    fn extend<I: IntoIterator<Item = TlvObject>>(&mut self, iter: I) {
        for tlv in iter {
            self.objects.push(Arc::new(tlv));
        }
    }
}

/// Decodes records from `source` until it is cleanly exhausted, using the default limits.
///
/// See [`read_list_with`].
pub fn read_list<R: Read + ?Sized>(source: &mut R) -> Result<TlvList, ListReadError> {
    read_list_with(source, &CodecConfig::default())
}

/// Decodes records from `source` until it is cleanly exhausted.
///
/// A clean end of stream at a record boundary ends the list successfully. Any other error stops
/// decoding and is returned together with the records decoded so far.
pub fn read_list_with<R: Read + ?Sized>(
    source: &mut R,
    config: &CodecConfig,
) -> Result<TlvList, ListReadError> {
    let mut list = TlvList::new();
    loop {
        match read_tlv_with(source, config) {
            Ok(tlv) => list.objects.push(Arc::new(tlv)),
            Err(TlvError::EndOfStream) => {
                debug!("TLV list read complete: {} records", list.len());
                return Ok(list);
            }
            Err(err) => {
                debug!("TLV list read stopped after {} records", list.len());
                return Err(ListReadError { list, source: err });
            }
        }
    }
}
