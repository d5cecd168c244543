//! BINRPC packet and record codec for the Kamailio control socket.
//!
//! Every packet starts with a variable-width header:
//! - 1 byte carrying the magic nibble `0xA` and protocol version `1`
//! - 1 byte of packet kind flags and the widths of the next two fields
//! - a 1..=4 byte big-endian payload length
//! - a 1..=4 byte big-endian cookie used to pair replies with requests
//!
//! The payload is a sequence of self-describing records: integers,
//! NUL-terminated strings, fixed-point doubles and keyed structs.
//! Readers consume whole packets before decoding, so a malformed payload
//! never desynchronizes the stream.

pub mod codec;
pub mod coerce;
pub mod cookie;
pub mod error;
pub mod header;
pub mod reader;
pub mod record;
pub mod varsize;
pub mod writer;

pub use codec::{decode_payload, encode_packet, CodecConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAYLOAD};
pub use coerce::Shape;
pub use cookie::{CookieSource, RandomCookies};
pub use error::{BinRpcError, ProtocolError, Result};
pub use header::{decode_header, encode_header, Header, PacketKind};
pub use reader::{read_packet, PacketReader};
pub use record::{decode_record, encode_record, Record, RecordType, StructItem, Value};
pub use varsize::{minimal_size, minimal_unsigned_size};
pub use writer::{write_packet, write_packet_with, PacketWriter};
