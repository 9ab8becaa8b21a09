//! TLV (Type-Length-Value) record encoding and decoding.
//!
//! # Wire format
//! - Type (1 byte): unsigned tag
//! - Length (4 bytes): signed 32-bit, big-endian
//! - Value (Length bytes): opaque payload
//!
//! Records are concatenated without delimiters. A value may itself hold encoded records; this
//! module never looks inside it.

use std::{
    fmt::{self, Write as _},
    io::{self, Read, Write},
};

use tracing::trace;

use crate::{CodecConfig, TlvError, TlvResult};

/// TLV header size in bytes (1 byte Type + 4 bytes Length)
pub const TLV_HEADER_SIZE: usize = 5;

/// Read-only view of a single TLV record.
///
/// Implementors must keep `length()` equal to `value().len()`.
pub trait Tlv: fmt::Debug + Send + Sync {
    /// Record type tag
    fn tlv_type(&self) -> u8;

    /// Length of the value in bytes, as carried on the wire
    fn length(&self) -> i32;

    /// Raw value bytes
    fn value(&self) -> &[u8];

    /// Total encoded size of this record in bytes.
    #[inline]
    fn encoded_size(&self) -> usize {
        TLV_HEADER_SIZE + self.value().len()
    }

    /// Checks that the length field matches the actual value length.
    #[inline]
    fn is_valid(&self) -> bool {
        usize::try_from(self.length()).map_or(false, |len| len == self.value().len())
    }
}

/// Structural equality of two optional records.
///
/// Two absent records are equal, an absent and a present one never are. Present records are
/// equal when type, length and value bytes all match.
pub fn tlv_equal(a: Option<&dyn Tlv>, b: Option<&dyn Tlv>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.tlv_type() == b.tlv_type() && a.length() == b.length() && a.value() == b.value()
        }
        _ => false,
    }
}

impl PartialEq for dyn Tlv + '_ {
    fn eq(&self, other: &Self) -> bool {
        tlv_equal(Some(self), Some(other))
    }
}

/// An owned TLV record.
///
/// The value is copied on construction and the length is derived from it.
#[derive(Debug, Clone, Eq)]
#[cfg_attr(
    feature = "with_serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "TlvRepr", from = "TlvRepr")
)]
pub struct TlvObject {
    tlv_type: u8,
    length: i32,
    value: Vec<u8>,
}

impl TlvObject {
    /// Creates a record holding a private copy of `value`.
    ///
    /// Values longer than `i32::MAX` bytes are not representable on the wire.
    pub fn new(tlv_type: u8, value: &[u8]) -> Self {
        Self {
            tlv_type,
            length: value.len() as i32,
            value: value.to_vec(),
        }
    }

    /// Consumes the record and returns its value bytes.
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }
}

impl Tlv for TlvObject {
    fn tlv_type(&self) -> u8 {
        self.tlv_type
    }

    fn length(&self) -> i32 {
        self.length
    }

    fn value(&self) -> &[u8] {
        &self.value
    }
}

impl PartialEq for TlvObject {
    fn eq(&self, other: &Self) -> bool {
        tlv_equal(Some(self), Some(other))
    }
}

impl fmt::Display for TlvObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_tlv(self, f)
    }
}

impl<'a> From<TlvRef<'a>> for TlvObject {
    fn from(tlv: TlvRef<'a>) -> Self {
        TlvObject::new(tlv.tlv_type, tlv.value)
    }
}

#[cfg(feature = "with_serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct TlvRepr {
    #[serde(rename = "type")]
    tlv_type: u8,
    value: Vec<u8>,
}

#[cfg(feature = "with_serde")]
impl From<TlvObject> for TlvRepr {
    fn from(tlv: TlvObject) -> Self {
        Self {
            tlv_type: tlv.tlv_type,
            value: tlv.value,
        }
    }
}

#[cfg(feature = "with_serde")]
impl From<TlvRepr> for TlvObject {
    fn from(repr: TlvRepr) -> Self {
        Self {
            tlv_type: repr.tlv_type,
            length: repr.value.len() as i32,
            value: repr.value,
        }
    }
}

/// A TLV record borrowing its value from a larger buffer.
#[derive(Debug, Clone, Copy, Eq)]
pub struct TlvRef<'a> {
    tlv_type: u8,
    length: i32,
    value: &'a [u8],
}

impl<'a> TlvRef<'a> {
    /// Decodes one record from the start of `data`.
    ///
    /// Returns the record and the number of bytes it occupies.
    pub fn decode(data: &'a [u8]) -> TlvResult<(Self, usize)> {
        Self::decode_with(data, &CodecConfig::default())
    }

    /// Decodes one record from the start of `data`, enforcing the limits in `config`.
    ///
    /// An empty buffer is a clean [`TlvError::EndOfStream`]; a partial header is an
    /// `UnexpectedEof` I/O error, matching [`read_tlv`] over the same bytes.
    pub fn decode_with(data: &'a [u8], config: &CodecConfig) -> TlvResult<(Self, usize)> {
        if data.is_empty() {
            return Err(TlvError::EndOfStream);
        }
        if data.len() < TLV_HEADER_SIZE {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        let tlv_type = data[0];
        let length = i32::from_be_bytes([data[1], data[2], data[3], data[4]]);
        let expected = check_length(length, config)?;

        let available = data.len() - TLV_HEADER_SIZE;
        if available < expected {
            return Err(TlvError::Read {
                expected,
                actual: available,
            });
        }

        let total_size = TLV_HEADER_SIZE + expected;
        Ok((
            Self {
                tlv_type,
                length,
                value: &data[TLV_HEADER_SIZE..total_size],
            },
            total_size,
        ))
    }

    /// Value bytes with the lifetime of the underlying buffer.
    pub fn as_slice(&self) -> &'a [u8] {
        self.value
    }
}

impl Tlv for TlvRef<'_> {
    fn tlv_type(&self) -> u8 {
        self.tlv_type
    }

    fn length(&self) -> i32 {
        self.length
    }

    fn value(&self) -> &[u8] {
        self.value
    }
}

impl PartialEq for TlvRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        tlv_equal(Some(self), Some(other))
    }
}

impl fmt::Display for TlvRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_tlv(self, f)
    }
}

/// Builds an owned record from a type and a copy of `value`.
pub fn new_tlv(tlv_type: u8, value: &[u8]) -> TlvObject {
    TlvObject::new(tlv_type, value)
}

/// Encodes a record into a freshly allocated buffer.
pub fn to_bytes<T: Tlv + ?Sized>(tlv: &T) -> TlvResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(tlv.encoded_size());
    write_tlv(tlv, &mut bytes)?;
    Ok(bytes)
}

/// Decodes the first record in `data`. Trailing bytes are ignored.
pub fn from_bytes(data: &[u8]) -> TlvResult<TlvObject> {
    let mut reader = data;
    read_tlv(&mut reader)
}

/// Writes a record to `sink`: type byte, big-endian length, then the value.
///
/// Each segment is handed to the sink in a single `write` call. A sink that accepts fewer bytes
/// than offered fails the whole record with [`TlvError::Write`]; short writes are not retried.
/// Only `Interrupted` calls are repeated.
pub fn write_tlv<T, W>(tlv: &T, sink: &mut W) -> TlvResult<()>
where
    T: Tlv + ?Sized,
    W: Write + ?Sized,
{
    write_segment(sink, &[tlv.tlv_type()])?;
    write_segment(sink, &tlv.length().to_be_bytes())?;

    let value = tlv.value();
    let written = if value.is_empty() {
        0
    } else {
        write_retrying(sink, value)?
    };
    if i64::from(tlv.length()) != written as i64 {
        return Err(TlvError::Write {
            expected: usize::try_from(tlv.length()).unwrap_or(0),
            actual: written,
        });
    }

    trace!("Wrote TLV type=0x{:02x} len={}", tlv.tlv_type(), tlv.length());
    Ok(())
}

/// Reads one record from `source` using the default limits.
///
/// See [`read_tlv_with`].
pub fn read_tlv<R: Read + ?Sized>(source: &mut R) -> TlvResult<TlvObject> {
    read_tlv_with(source, &CodecConfig::default())
}

/// Reads one record from `source`, enforcing the limits in `config`.
///
/// - [`TlvError::EndOfStream`] if the source is exhausted before the type byte.
/// - [`TlvError::Io`] if the source fails, or ends inside the length header.
/// - [`TlvError::NegativeLength`] / [`TlvError::ValueTooLong`] for a rejected length header.
/// - [`TlvError::Read`] if the value segment ends early.
pub fn read_tlv_with<R: Read + ?Sized>(
    source: &mut R,
    config: &CodecConfig,
) -> TlvResult<TlvObject> {
    let tlv_type = match read_type(source)? {
        Some(tlv_type) => tlv_type,
        None => return Err(TlvError::EndOfStream),
    };

    let mut length_bytes = [0u8; 4];
    source.read_exact(&mut length_bytes)?;
    let length = i32::from_be_bytes(length_bytes);
    let expected = check_length(length, config)?;

    // Buffer grows with the bytes received, not with the header.
    let mut value = Vec::new();
    let actual = (&mut *source).take(expected as u64).read_to_end(&mut value)?;
    if actual != expected {
        return Err(TlvError::Read { expected, actual });
    }

    trace!("Read TLV type=0x{:02x} len={}", tlv_type, length);
    Ok(TlvObject {
        tlv_type,
        length,
        value,
    })
}

/// Reads the type byte; `None` means the source had nothing left.
fn read_type<R: Read + ?Sized>(source: &mut R) -> TlvResult<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match source.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Single `write` call, repeated only while the sink reports `Interrupted`.
fn write_retrying<W: Write + ?Sized>(sink: &mut W, buf: &[u8]) -> io::Result<usize> {
    loop {
        match sink.write(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

fn write_segment<W: Write + ?Sized>(sink: &mut W, segment: &[u8]) -> TlvResult<()> {
    let written = write_retrying(sink, segment)?;
    if written != segment.len() {
        return Err(TlvError::Write {
            expected: segment.len(),
            actual: written,
        });
    }
    Ok(())
}

/// Validates a decoded length header and converts it to a byte count.
fn check_length(length: i32, config: &CodecConfig) -> TlvResult<usize> {
    if length < 0 {
        return Err(TlvError::NegativeLength(length));
    }
    let length = length as u32;
    if length > config.max_value_length {
        return Err(TlvError::ValueTooLong {
            length,
            max: config.max_value_length,
        });
    }
    Ok(length as usize)
}

fn fmt_tlv<T: Tlv + ?Sized>(tlv: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "Tlv(type=0x{:02x}, len={}, value={})",
        tlv.tlv_type(),
        tlv.length(),
        value_to_string(tlv.value())
    )
}

/// Renders printable UTF-8 quoted, anything else as hex.
fn value_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.chars().all(|c| !c.is_control() || c == '\n' || c == '\t') => {
            format!("\"{}\"", s)
        }
        _ => bytes_to_hex(bytes),
    }
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut hex = String::from("0x");
    for byte in bytes {
        let _ = write!(&mut hex, "{:02x}", byte);
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    /// Sink that accepts at most `limit` bytes per call.
    struct ShortWriter {
        limit: usize,
        inner: Vec<u8>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.inner.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Sink that fails every write.
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_new_copies_value_and_derives_length() {
        let mut value = b"Worker_001".to_vec();
        let tlv = new_tlv(0x02, &value);
        value[0] = b'X';

        assert_eq!(tlv.tlv_type(), 0x02);
        assert_eq!(tlv.length(), 10);
        assert_eq!(tlv.value(), b"Worker_001");
        assert!(tlv.is_valid());
        assert_eq!(tlv.encoded_size(), 15);
    }

    #[test]
    fn test_tlv_encode_format() {
        let tlv = new_tlv(0x01, b"test");
        let encoded = to_bytes(&tlv).unwrap();

        assert_eq!(encoded[0], 0x01); // type
        assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x04]); // length, big-endian
        assert_eq!(&encoded[5..], b"test");
    }

    #[test]
    fn test_encode_decode() {
        let tlv = new_tlv(0x7f, b"payload");
        let decoded = from_bytes(&to_bytes(&tlv).unwrap()).unwrap();
        assert_eq!(decoded, tlv);
    }

    #[quickcheck]
    fn prop_encode_decode_preserves_record(tlv_type: u8, value: Vec<u8>) -> bool {
        let tlv = new_tlv(tlv_type, &value);
        match to_bytes(&tlv).and_then(|bytes| from_bytes(&bytes)) {
            Ok(decoded) => decoded == tlv && decoded.encoded_size() == TLV_HEADER_SIZE + value.len(),
            Err(_) => false,
        }
    }

    #[test]
    fn test_zero_length_value() {
        let tlv = new_tlv(0x09, &[]);
        let encoded = to_bytes(&tlv).unwrap();
        assert_eq!(encoded, vec![0x09, 0, 0, 0, 0]);

        let decoded = from_bytes(&encoded).unwrap();
        assert_eq!(decoded.length(), 0);
        assert!(decoded.value().is_empty());
    }

    #[test]
    fn test_equal_handles_absent_records() {
        let a = new_tlv(1, b"abc");
        assert!(tlv_equal(None, None));
        assert!(!tlv_equal(None, Some(&a)));
        assert!(!tlv_equal(Some(&a), None));
        assert!(tlv_equal(Some(&a), Some(&a)));
    }

    #[test]
    fn test_equal_compares_type_and_value() {
        let a = new_tlv(1, b"abc");
        assert_ne!(a, new_tlv(2, b"abc"));
        assert_ne!(a, new_tlv(1, b"abd"));
        assert_ne!(a, new_tlv(1, b"abcd"));
        assert_eq!(a, new_tlv(1, b"abc"));
    }

    #[test]
    fn test_read_empty_source_is_end_of_stream() {
        let err = from_bytes(&[]).unwrap_err();
        assert!(err.is_end_of_stream());
    }

    #[test]
    fn test_read_truncated_header_is_io_error() {
        let err = from_bytes(&[0x01, 0x00, 0x00]).unwrap_err();
        match err {
            TlvError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_read_short_value_is_read_error() {
        let mut buffer = vec![0x01, 0x00, 0x00, 0x00, 0x0a];
        buffer.extend_from_slice(b"short");

        let err = from_bytes(&buffer).unwrap_err();
        assert!(matches!(
            err,
            TlvError::Read {
                expected: 10,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_read_rejects_negative_length() {
        let buffer = [0x01, 0xff, 0xff, 0xff, 0xff, 0xaa];
        let err = from_bytes(&buffer).unwrap_err();
        assert!(matches!(err, TlvError::NegativeLength(-1)));
    }

    #[test]
    fn test_read_enforces_configured_limit() {
        let encoded = to_bytes(&new_tlv(0x01, b"0123456789")).unwrap();
        let config = CodecConfig::new(8);

        let err = read_tlv_with(&mut encoded.as_slice(), &config).unwrap_err();
        assert!(matches!(err, TlvError::ValueTooLong { length: 10, max: 8 }));

        let config = CodecConfig::new(10);
        assert!(read_tlv_with(&mut encoded.as_slice(), &config).is_ok());
    }

    #[test]
    fn test_read_consumes_exactly_one_record() {
        let mut buffer = to_bytes(&new_tlv(1, b"one")).unwrap();
        buffer.extend_from_slice(&to_bytes(&new_tlv(2, b"two")).unwrap());

        let mut reader = buffer.as_slice();
        assert_eq!(read_tlv(&mut reader).unwrap(), new_tlv(1, b"one"));
        assert_eq!(read_tlv(&mut reader).unwrap(), new_tlv(2, b"two"));
        assert!(read_tlv(&mut reader).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_short_write_is_write_error() {
        let mut sink = ShortWriter {
            limit: 4,
            inner: Vec::new(),
        };
        let err = write_tlv(&new_tlv(1, b"abcdef"), &mut sink).unwrap_err();
        assert!(matches!(
            err,
            TlvError::Write {
                expected: 6,
                actual: 4
            }
        ));
        // Header went out before the value was cut short.
        assert_eq!(sink.inner.len(), TLV_HEADER_SIZE + 4);
    }

    /// Sink that reports `Interrupted` on every other call.
    struct InterruptingWriter {
        interrupt_next: bool,
        inner: Vec<u8>,
    }

    impl Write for InterruptingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.interrupt_next = true;
            self.inner.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_interrupted_write_is_retried() {
        let tlv = new_tlv(0x03, b"signal");
        let mut sink = InterruptingWriter {
            interrupt_next: true,
            inner: Vec::new(),
        };

        write_tlv(&tlv, &mut sink).unwrap();
        assert_eq!(sink.inner, to_bytes(&tlv).unwrap());
    }

    #[test]
    fn test_sink_failure_is_propagated() {
        let err = write_tlv(&new_tlv(1, b"abc"), &mut BrokenWriter).unwrap_err();
        match err {
            TlvError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tlv_ref_decode() {
        let mut buffer = to_bytes(&new_tlv(0x05, b"borrowed")).unwrap();
        buffer.push(0xee);

        let (tlv, consumed) = TlvRef::decode(&buffer).unwrap();
        assert_eq!(consumed, TLV_HEADER_SIZE + 8);
        assert_eq!(tlv.as_slice(), b"borrowed");
        assert_eq!(TlvObject::from(tlv), new_tlv(0x05, b"borrowed"));
    }

    #[test]
    fn test_tlv_ref_decode_errors() {
        assert!(TlvRef::decode(&[]).unwrap_err().is_end_of_stream());
        assert!(matches!(
            TlvRef::decode(&[0x01, 0x00]),
            Err(TlvError::Io(_))
        ));
        assert!(matches!(
            TlvRef::decode(&[0x01, 0x00, 0x00, 0x00, 0x03, 0xaa]),
            Err(TlvError::Read {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_owned_and_borrowed_records_compare_structurally() {
        let owned = new_tlv(3, b"same");
        let encoded = to_bytes(&owned).unwrap();
        let (borrowed, _) = TlvRef::decode(&encoded).unwrap();

        assert!(tlv_equal(Some(&owned), Some(&borrowed)));
        let a: &dyn Tlv = &owned;
        let b: &dyn Tlv = &borrowed;
        assert!(a == b);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            new_tlv(0x01, b"test").to_string(),
            "Tlv(type=0x01, len=4, value=\"test\")"
        );
        assert_eq!(
            new_tlv(0xff, &[0x00, 0xff]).to_string(),
            "Tlv(type=0xff, len=2, value=0x00ff)"
        );
    }

    #[cfg(feature = "with_serde")]
    #[test]
    fn test_serde_recomputes_length() {
        let tlv = new_tlv(0x04, b"json");
        let json = serde_json::to_string(&tlv).unwrap();
        assert_eq!(json, r#"{"type":4,"value":[106,115,111,110]}"#);

        let decoded: TlvObject = serde_json::from_str(r#"{"type":4,"value":[1,2]}"#).unwrap();
        assert_eq!(decoded.length(), 2);
        assert!(decoded.is_valid());
    }
}
