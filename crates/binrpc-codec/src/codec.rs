use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::error::{BinRpcError, ProtocolError, Result};
use crate::header::{encode_header, Header, PacketKind, MAX_HEADER_SIZE};
use crate::record::{decode_record, encode_record, Record, Value};

/// Default maximum payload size accepted from a peer: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Default maximum struct nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configuration for the packet codec.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum declared payload size accepted when reading. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Maximum struct nesting depth for both directions. Default: 32.
    pub max_depth: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_depth: DEFAULT_MAX_DEPTH,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// `read_exact` that reports a stream ending early as
/// [`BinRpcError::ConnectionClosed`].
pub(crate) fn read_exact<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<()> {
    src.read_exact(buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => BinRpcError::ConnectionClosed,
        _ => BinRpcError::Io(err),
    })
}

/// Encode a complete packet (header and payload) into `dst`.
///
/// Nothing is appended to `dst` unless every value encodes. Returns the
/// header that was written.
pub fn encode_packet(
    kind: PacketKind,
    cookie: u32,
    values: &[Value],
    max_depth: usize,
    dst: &mut BytesMut,
) -> Result<Header> {
    let mut payload = BytesMut::new();
    for value in values {
        encode_record(value, &mut payload, max_depth)?;
    }

    let header = Header {
        kind,
        payload_length: payload.len(),
        cookie,
    };
    dst.reserve(MAX_HEADER_SIZE + payload.len());
    encode_header(&header, dst)?;
    dst.extend_from_slice(&payload);
    Ok(header)
}

/// Decode every record of a payload.
///
/// The records' wire sizes must add up to exactly `payload.len()`; a record
/// running past the end is [`ProtocolError::RecordOverrun`].
pub fn decode_payload(payload: &[u8], max_depth: usize) -> Result<Vec<Record>> {
    let declared = payload.len();
    let mut consumed = 0;
    let mut records = Vec::new();

    while consumed < declared {
        let mut remaining = &payload[consumed..];
        let record = match decode_record(&mut remaining, max_depth) {
            Ok(record) => record,
            Err(BinRpcError::ConnectionClosed) => {
                return Err(ProtocolError::RecordOverrun {
                    offset: consumed,
                    declared,
                }
                .into());
            }
            Err(err) => return Err(err),
        };

        let next = consumed + record.wire_size();
        if next > declared || remaining.len() != declared - next {
            return Err(ProtocolError::RecordOverrun {
                offset: consumed,
                declared,
            }
            .into());
        }
        consumed = next;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StructItem;

    #[test]
    fn encodes_reference_request() {
        let mut buf = BytesMut::new();
        let header = encode_packet(
            PacketKind::Request,
            0x6F8D_A297,
            &[Value::from("tm.stats")],
            DEFAULT_MAX_DEPTH,
            &mut buf,
        )
        .unwrap();
        assert_eq!(header.payload_length, 11);

        let expected = [
            0xA1, 0x03, 0x0B, 0x6F, 0x8D, 0xA2, 0x97, // header
            0x91, 0x09, 0x74, 0x6D, 0x2E, 0x73, 0x74, 0x61, 0x74, 0x73, 0x00,
        ];
        assert_eq!(buf.as_ref(), &expected);
    }

    #[test]
    fn failed_value_leaves_buffer_untouched() {
        let mut buf = BytesMut::new();
        let err = encode_packet(
            PacketKind::Request,
            1,
            &[Value::from("ok"), Value::Double(f64::NAN)],
            DEFAULT_MAX_DEPTH,
            &mut buf,
        )
        .unwrap_err();

        assert!(matches!(err, BinRpcError::Encoding(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn payload_records_sum_to_length() {
        let values = [
            Value::from("core.echo"),
            Value::from(42),
            Value::from(vec![StructItem::new("a", 1), StructItem::new("a", "two")]),
        ];
        let mut payload = BytesMut::new();
        for value in &values {
            encode_record(value, &mut payload, DEFAULT_MAX_DEPTH).unwrap();
        }

        let records = decode_payload(&payload, DEFAULT_MAX_DEPTH).unwrap();
        let decoded: Vec<_> = records.iter().map(|r| r.value.clone()).collect();
        assert_eq!(decoded, values);

        let total: usize = records.iter().map(Record::wire_size).sum();
        assert_eq!(total, payload.len());
    }

    #[test]
    fn sole_struct_wire_size_is_payload_length() {
        let value = Value::from(vec![
            StructItem::new("total", 8_388_605),
            StructItem::new("total", 1),
        ]);
        let mut payload = BytesMut::new();
        encode_record(&value, &mut payload, DEFAULT_MAX_DEPTH).unwrap();

        let records = decode_payload(&payload, DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].wire_size(), payload.len());
    }

    #[test]
    fn empty_payload_has_no_records() {
        assert!(decode_payload(&[], DEFAULT_MAX_DEPTH).unwrap().is_empty());
    }

    #[test]
    fn truncated_record_is_overrun() {
        // A 9-byte string declared, only 3 payload bytes present.
        let payload = [0x10, 0x2A, 0x91, 0x09, b't', b'm', b'.'];
        let err = decode_payload(&payload, DEFAULT_MAX_DEPTH).unwrap_err();

        assert!(matches!(
            err,
            BinRpcError::Protocol(ProtocolError::RecordOverrun {
                offset: 2,
                declared: 7
            })
        ));
    }

    #[test]
    fn unterminated_struct_is_overrun() {
        let payload = [0x03, 0x25, b'k', 0x00, 0x10, 0x01];
        let err = decode_payload(&payload, DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(
            err,
            BinRpcError::Protocol(ProtocolError::RecordOverrun { offset: 0, .. })
        ));
    }

    #[test]
    fn read_exact_maps_eof() {
        let mut src: &[u8] = &[1, 2];
        let mut buf = [0u8; 3];
        assert!(matches!(
            read_exact(&mut src, &mut buf),
            Err(BinRpcError::ConnectionClosed)
        ));
    }
}
