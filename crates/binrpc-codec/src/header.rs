use std::io::Read;

use bytes::{BufMut, BytesMut};

use crate::codec::read_exact;
use crate::error::{BinRpcError, ProtocolError, Result};
use crate::varsize::{minimal_size, minimal_unsigned_size, read_unsigned};

/// Magic value in the high nibble of the first header byte.
pub const MAGIC: u8 = 0xA;

/// Protocol version in the low nibble of the first header byte.
pub const VERSION: u8 = 0x1;

/// The payload length field is at most 4 bytes: its width is sent as
/// `width - 1` in 2 bits.
pub const MAX_LENGTH_WIDTH: usize = 4;

/// Largest possible header: 2 fixed bytes, 4 length bytes, 4 cookie bytes.
pub const MAX_HEADER_SIZE: usize = 2 + MAX_LENGTH_WIDTH + 4;

/// Packet kind carried in the high nibble of the second header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// A function call.
    Request,
    /// A successful reply.
    Reply,
    /// An error reply: records are an integer code and a message.
    Fault,
    /// Any other flag nibble; kept as is.
    Other(u8),
}

impl PacketKind {
    pub fn from_flags(flags: u8) -> Self {
        match flags & 0x0F {
            0 => PacketKind::Request,
            1 => PacketKind::Reply,
            3 => PacketKind::Fault,
            other => PacketKind::Other(other),
        }
    }

    pub fn flags(self) -> u8 {
        match self {
            PacketKind::Request => 0,
            PacketKind::Reply => 1,
            PacketKind::Fault => 3,
            PacketKind::Other(flags) => flags & 0x0F,
        }
    }
}

/// Values needed to parse a payload and to correlate a reply.
///
/// This is not the binary layout of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: PacketKind,
    pub payload_length: usize,
    pub cookie: u32,
}

/// Read a packet header from `src`.
///
/// Wire format:
/// ```text
/// ┌───────────┬────────────────────────┬────────────┬────────────┐
/// │ magic|ver │ kind|len-1|cookie-1    │ length     │ cookie     │
/// │ 4b | 4b   │ 4b | 2b | 2b           │ (1-4B BE)  │ (1-4B BE)  │
/// └───────────┴────────────────────────┴────────────┴────────────┘
/// ```
pub fn decode_header<R: Read>(src: &mut R) -> Result<Header> {
    let mut fixed = [0u8; 2];
    read_exact(src, &mut fixed)?;

    let magic = fixed[0] >> 4;
    if magic != MAGIC {
        return Err(ProtocolError::BadMagic(magic).into());
    }
    let version = fixed[0] & 0x0F;
    if version != VERSION {
        return Err(ProtocolError::BadVersion(version).into());
    }

    let kind = PacketKind::from_flags(fixed[1] >> 4);
    let length_width = usize::from((fixed[1] >> 2) & 0x03) + 1;
    let cookie_width = usize::from(fixed[1] & 0x03) + 1;

    let mut length = [0u8; 4];
    read_exact(src, &mut length[..length_width])?;
    let mut cookie = [0u8; 4];
    read_exact(src, &mut cookie[..cookie_width])?;

    Ok(Header {
        kind,
        payload_length: read_unsigned(&length[..length_width]) as usize,
        cookie: read_unsigned(&cookie[..cookie_width]) as u32,
    })
}

/// Append an encoded header to `dst`.
///
/// Fails with [`BinRpcError::LengthTooBig`] when the payload length cannot be
/// expressed in 4 bytes.
pub fn encode_header(header: &Header, dst: &mut BytesMut) -> Result<()> {
    let length = i64::try_from(header.payload_length).map_err(|_| BinRpcError::LengthTooBig {
        width: usize::BITS as usize / 8,
    })?;
    let length_width = minimal_size(length);
    if length_width > MAX_LENGTH_WIDTH {
        return Err(BinRpcError::LengthTooBig {
            width: length_width,
        });
    }
    let cookie_width = minimal_unsigned_size(u64::from(header.cookie));

    dst.reserve(2 + length_width + cookie_width);
    dst.put_u8(MAGIC << 4 | VERSION);
    dst.put_u8(header.kind.flags() << 4 | ((length_width - 1) as u8) << 2 | (cookie_width - 1) as u8);
    dst.put_uint(length as u64, length_width);
    dst.put_uint(u64::from(header.cookie), cookie_width);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn decodes_reference_header() {
        let data = [0xA1, 0x03, 0x0B, 0x6F, 0x8D, 0xA2, 0x97];
        let header = decode_header(&mut Cursor::new(&data[..])).unwrap();

        assert_eq!(header.kind, PacketKind::Request);
        assert_eq!(header.payload_length, 0x0B);
        assert_eq!(header.cookie, 0x6F8D_A297);
    }

    #[test]
    fn encodes_reference_header() {
        let header = Header {
            kind: PacketKind::Request,
            payload_length: 0x0B,
            cookie: 0x6F8D_A297,
        };
        let mut buf = BytesMut::new();
        encode_header(&header, &mut buf).unwrap();

        assert_eq!(buf.as_ref(), &[0xA1, 0x03, 0x0B, 0x6F, 0x8D, 0xA2, 0x97]);
    }

    #[test]
    fn decodes_fault_kind() {
        let data = [0xA1, 0x33, 0x2A, 0x51, 0x2A, 0xAE, 0xE4];
        let header = decode_header(&mut Cursor::new(&data[..])).unwrap();

        assert_eq!(header.kind, PacketKind::Fault);
        assert_eq!(header.payload_length, 42);
        assert_eq!(header.cookie, 0x512A_AEE4);
    }

    #[test]
    fn narrow_cookie_and_wide_length() {
        let header = Header {
            kind: PacketKind::Reply,
            payload_length: 200,
            cookie: 7,
        };
        let mut buf = BytesMut::new();
        encode_header(&header, &mut buf).unwrap();

        // 200 does not fit a signed byte, so the length takes 2 bytes.
        assert_eq!(buf.as_ref(), &[0xA1, 0x14, 0x00, 0xC8, 0x07]);
        assert_eq!(decode_header(&mut Cursor::new(buf.to_vec())).unwrap(), header);
    }

    #[test]
    fn high_cookie_stays_four_bytes() {
        let header = Header {
            kind: PacketKind::Request,
            payload_length: 3,
            cookie: 0xFFFF_FFFF,
        };
        let mut buf = BytesMut::new();
        encode_header(&header, &mut buf).unwrap();

        assert_eq!(buf.len(), 2 + 1 + 4);
        assert_eq!(decode_header(&mut Cursor::new(buf.to_vec())).unwrap(), header);
    }

    #[test]
    fn rejects_length_beyond_four_bytes() {
        let header = Header {
            kind: PacketKind::Request,
            payload_length: 0x8000_0000,
            cookie: 1,
        };
        let mut buf = BytesMut::new();
        let err = encode_header(&header, &mut buf).unwrap_err();

        assert!(matches!(err, BinRpcError::LengthTooBig { width: 8 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let data = [0xB1, 0x03, 0x0B, 0x6F, 0x8D, 0xA2, 0x97];
        let err = decode_header(&mut Cursor::new(&data[..])).unwrap_err();
        assert!(matches!(
            err,
            BinRpcError::Protocol(ProtocolError::BadMagic(0xB))
        ));
    }

    #[test]
    fn rejects_bad_version() {
        let data = [0xA2, 0x03, 0x0B, 0x6F, 0x8D, 0xA2, 0x97];
        let err = decode_header(&mut Cursor::new(&data[..])).unwrap_err();
        assert!(matches!(
            err,
            BinRpcError::Protocol(ProtocolError::BadVersion(2))
        ));
    }

    #[test]
    fn short_header_is_connection_closed() {
        let data = [0xA1, 0x03, 0x0B, 0x6F];
        let err = decode_header(&mut Cursor::new(&data[..])).unwrap_err();
        assert!(matches!(err, BinRpcError::ConnectionClosed));
    }

    #[test]
    fn packet_kind_flags_roundtrip() {
        for flags in 0..16u8 {
            assert_eq!(PacketKind::from_flags(flags).flags(), flags);
        }
        assert_eq!(PacketKind::from_flags(2), PacketKind::Other(2));
    }
}
