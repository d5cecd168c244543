//! Self-describing records: the values carried in a packet payload.
//!
//! Every record starts with one header byte:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───┬───────────┬───────────────┐
//! │ X │   size    │     type      │
//! └───┴───────────┴───────────────┘
//! ```
//!
//! With `X = 0` the payload length (0-7) is inline. With `X = 1` the three
//! size bits give the width of a big-endian length field that follows the
//! header byte. `X = 1, size = 0, type = struct` is not a record but the
//! marker closing the innermost struct.

use std::fmt;
use std::io::Read;

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::codec::read_exact;
use crate::error::{BinRpcError, ProtocolError, Result};
use crate::varsize::{minimal_size, read_signed, read_unsigned};

/// Header byte closing a struct.
pub const END_OF_STRUCT: u8 = 0x80 | RecordType::Struct as u8;

/// Largest payload that fits the 3-bit inline size.
const MAX_INLINE_SIZE: usize = 7;

/// Integer payloads are 32-bit at most.
const MAX_INT_WIDTH: usize = 4;

/// Fixed-point scale of doubles on the wire: 3 decimal digits.
const DOUBLE_SCALE: f64 = 1000.0;

/// Wire type tag in the low nibble of a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    Int = 0,
    Str = 1,
    Double = 2,
    Struct = 3,
    Array = 4,
    /// Attribute name: a string used as a struct member name.
    Avp = 5,
    Bytes = 6,
}

impl RecordType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(RecordType::Int),
            1 => Some(RecordType::Str),
            2 => Some(RecordType::Double),
            3 => Some(RecordType::Struct),
            4 => Some(RecordType::Array),
            5 => Some(RecordType::Avp),
            6 => Some(RecordType::Bytes),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RecordType::Int => "int",
            RecordType::Str => "string",
            RecordType::Double => "double",
            RecordType::Struct => "struct",
            RecordType::Array => "array",
            RecordType::Avp => "attribute name",
            RecordType::Bytes => "bytes",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), *self as u8)
    }
}

/// A decoded or to-be-encoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Big-endian two's complement on the wire, sign-extended on decode.
    ///
    /// Kamailio strips leading zero bytes from counters without regard to
    /// sign, so a positive value such as `0x8929F5` sent in 3 bytes reads
    /// back negative.
    Int(i32),
    Str(String),
    /// Carried on the wire as a fixed-point integer with 3 decimals.
    Double(f64),
    /// Ordered members; a key may appear more than once.
    Struct(Vec<StructItem>),
}

impl Value {
    pub fn record_type(&self) -> RecordType {
        match self {
            Value::Int(_) => RecordType::Int,
            Value::Str(_) => RecordType::Str,
            Value::Double(_) => RecordType::Double,
            Value::Struct(_) => RecordType::Struct,
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Vec<StructItem>> for Value {
    fn from(items: Vec<StructItem>) -> Self {
        Value::Struct(items)
    }
}

/// A value together with the number of wire bytes it occupied.
///
/// `wire_size` covers the record header, any explicit size field, the
/// payload and, for structs, every nested member record plus the closing
/// marker. Records built from host values have a wire size of 0. Equality
/// only compares values.
#[derive(Debug, Clone)]
pub struct Record {
    pub value: Value,
    wire_size: usize,
}

impl Record {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            wire_size: 0,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.value.record_type()
    }

    /// Bytes this record occupied on the wire, 0 if it was not decoded.
    pub fn wire_size(&self) -> usize {
        self.wire_size
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

macro_rules! record_from {
    ($($host:ty),*) => {
        $(impl From<$host> for Record {
            fn from(value: $host) -> Self {
                Record::new(value)
            }
        })*
    };
}

record_from!(Value, i32, &str, String, f64, Vec<StructItem>);

/// One member of a struct.
#[derive(Debug, Clone, PartialEq)]
pub struct StructItem {
    pub key: String,
    pub value: Record,
}

impl StructItem {
    pub fn new(key: impl Into<String>, value: impl Into<Record>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// What one header byte and its payload turned out to be.
enum Decoded {
    Record(Record, RecordType),
    EndOfStruct,
}

/// Decode one record from `src`.
///
/// Structs may nest at most `max_depth` levels; deeper input fails with
/// [`BinRpcError::DepthExceeded`].
pub fn decode_record<R: Read>(src: &mut R, max_depth: usize) -> Result<Record> {
    match decode_item(src, 0, max_depth)? {
        Decoded::Record(record, _) => Ok(record),
        Decoded::EndOfStruct => Err(ProtocolError::UnexpectedEndOfStruct.into()),
    }
}

fn decode_item<R: Read>(src: &mut R, depth: usize, max_depth: usize) -> Result<Decoded> {
    let mut head = [0u8; 1];
    read_exact(src, &mut head)?;
    let head = head[0];

    let extended = head & 0x80 != 0;
    let size_bits = usize::from((head >> 4) & 0x07);
    let tag = head & 0x0F;

    if head == END_OF_STRUCT {
        return Ok(Decoded::EndOfStruct);
    }

    let mut wire_size = 1;
    let size = if extended {
        let mut field = [0u8; MAX_INLINE_SIZE];
        read_exact(src, &mut field[..size_bits])?;
        wire_size += size_bits;
        // Sizes past the address space cannot be satisfied by any source.
        usize::try_from(read_unsigned(&field[..size_bits])).unwrap_or(usize::MAX)
    } else {
        size_bits
    };

    let record_type = RecordType::from_tag(tag).ok_or(BinRpcError::TypeNotImplemented(tag))?;

    let value = match record_type {
        RecordType::Int => {
            let payload = read_payload(src, size)?;
            Value::Int(decode_int(&payload)?)
        }
        RecordType::Str | RecordType::Avp => {
            let payload = read_payload(src, size)?;
            Value::Str(decode_str(payload)?)
        }
        RecordType::Double => {
            let payload = read_payload(src, size)?;
            Value::Double(f64::from(decode_int(&payload)?) / DOUBLE_SCALE)
        }
        RecordType::Struct => {
            if depth >= max_depth {
                return Err(BinRpcError::DepthExceeded { max: max_depth });
            }
            // Bytes declared by a struct header precede the members and are skipped.
            read_payload(src, size)?;
            let (items, members_size) = decode_struct_members(src, depth + 1, max_depth)?;
            wire_size += members_size;
            Value::Struct(items)
        }
        RecordType::Array | RecordType::Bytes => {
            return Err(BinRpcError::TypeNotImplemented(tag));
        }
    };

    wire_size += size;
    trace!(record_type = record_type.name(), wire_size, "decoded record");

    Ok(Decoded::Record(Record { value, wire_size }, record_type))
}

/// Decode key/value pairs up to and including the closing marker.
///
/// Returns the members and the bytes they occupied, marker included.
fn decode_struct_members<R: Read>(
    src: &mut R,
    depth: usize,
    max_depth: usize,
) -> Result<(Vec<StructItem>, usize)> {
    let mut items = Vec::new();
    let mut consumed = 0;

    loop {
        let key = match decode_item(src, depth, max_depth)? {
            Decoded::EndOfStruct => {
                consumed += 1;
                break;
            }
            Decoded::Record(
                Record {
                    value: Value::Str(key),
                    wire_size,
                },
                RecordType::Avp | RecordType::Str,
            ) => {
                consumed += wire_size;
                key
            }
            Decoded::Record(_, other) => {
                return Err(ProtocolError::UnexpectedStructKey(other).into());
            }
        };

        let value = match decode_item(src, depth, max_depth)? {
            Decoded::Record(record, _) => record,
            Decoded::EndOfStruct => return Err(ProtocolError::UnexpectedEndOfStruct.into()),
        };
        consumed += value.wire_size;

        items.push(StructItem { key, value });
    }

    Ok((items, consumed))
}

fn read_payload<R: Read>(src: &mut R, size: usize) -> Result<Vec<u8>> {
    if size == 0 {
        return Ok(Vec::new());
    }
    let mut payload = Vec::new();
    let read = src.take(size as u64).read_to_end(&mut payload)?;
    if read != size {
        return Err(BinRpcError::ConnectionClosed);
    }
    Ok(payload)
}

fn decode_int(payload: &[u8]) -> Result<i32> {
    if payload.len() > MAX_INT_WIDTH {
        return Err(ProtocolError::IntegerTooWide(payload.len()).into());
    }
    Ok(read_signed(payload) as i32)
}

fn decode_str(mut payload: Vec<u8>) -> Result<String> {
    if payload.is_empty() {
        return Ok(String::new());
    }
    if payload.pop() != Some(0) {
        return Err(ProtocolError::MissingNul.into());
    }
    String::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8.into())
}

/// Append one encoded record to `dst`.
///
/// Structs nested deeper than `max_depth` levels are rejected with
/// [`BinRpcError::DepthExceeded`], mirroring the decoder's limit.
pub fn encode_record(value: &Value, dst: &mut BytesMut, max_depth: usize) -> Result<()> {
    encode_value(value, dst, 0, max_depth)
}

fn encode_value(value: &Value, dst: &mut BytesMut, depth: usize, max_depth: usize) -> Result<()> {
    match value {
        Value::Int(n) => put_int(*n, RecordType::Int, dst),
        Value::Str(text) => put_str(text, RecordType::Str, dst),
        Value::Double(d) => put_int(double_to_fixed(*d)?, RecordType::Double, dst),
        Value::Struct(items) => {
            if depth >= max_depth {
                return Err(BinRpcError::DepthExceeded { max: max_depth });
            }
            dst.put_u8(RecordType::Struct as u8);
            for item in items {
                put_str(&item.key, RecordType::Avp, dst)?;
                encode_value(&item.value.value, dst, depth + 1, max_depth)?;
            }
            dst.put_u8(END_OF_STRUCT);
            Ok(())
        }
    }
}

fn put_int(n: i32, record_type: RecordType, dst: &mut BytesMut) -> Result<()> {
    // Zero is sent as an empty payload.
    if n == 0 {
        return put_record_head(0, record_type, dst);
    }
    let width = minimal_size(i64::from(n));
    put_record_head(width, record_type, dst)?;
    dst.put_int(i64::from(n), width);
    Ok(())
}

fn put_str(text: &str, record_type: RecordType, dst: &mut BytesMut) -> Result<()> {
    if text.as_bytes().contains(&0) {
        return Err(BinRpcError::Encoding(format!(
            "{} contains a NUL byte: {text:?}",
            record_type.name()
        )));
    }
    put_record_head(text.len() + 1, record_type, dst)?;
    dst.put_slice(text.as_bytes());
    dst.put_u8(0);
    Ok(())
}

/// Write a record header for a payload of `size` bytes.
fn put_record_head(size: usize, record_type: RecordType, dst: &mut BytesMut) -> Result<()> {
    let tag = record_type as u8;
    if size <= MAX_INLINE_SIZE {
        dst.put_u8((size as u8) << 4 | tag);
        return Ok(());
    }
    let size_width = i64::try_from(size).map(minimal_size).unwrap_or(usize::MAX);
    if size_width > MAX_INLINE_SIZE {
        return Err(BinRpcError::Encoding(format!(
            "{} payload of {size} bytes is too large for a record",
            record_type.name()
        )));
    }
    dst.put_u8(0x80 | (size_width as u8) << 4 | tag);
    dst.put_int(size as i64, size_width);
    Ok(())
}

fn double_to_fixed(d: f64) -> Result<i32> {
    let scaled = (d * DOUBLE_SCALE).round();
    if !scaled.is_finite() || scaled < f64::from(i32::MIN) || scaled > f64::from(i32::MAX) {
        return Err(BinRpcError::Encoding(format!(
            "double {d} is outside the 3-decimal fixed-point range"
        )));
    }
    Ok(scaled as i32)
}
