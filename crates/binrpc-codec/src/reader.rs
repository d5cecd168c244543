use std::io::Read;

use binrpc_transport::CtlStream;
use bytes::BytesMut;
use tracing::{debug, warn};

use crate::codec::{decode_payload, read_exact, CodecConfig};
use crate::error::{BinRpcError, Result};
use crate::header::{decode_header, Header, PacketKind};
use crate::record::Record;
use crate::writer::transport_to_codec_error;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Reads complete BINRPC packets from any `Read` stream.
///
/// The declared payload is read in full before any record is decoded, so a
/// malformed payload never leaves the stream mid-packet.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
    config: CodecConfig,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next packet and decode its records (blocking).
    ///
    /// With a non-zero `expected_cookie`, a packet stamped with another
    /// cookie is drained from the stream and reported as
    /// [`BinRpcError::CookieMismatch`].
    pub fn read_packet(&mut self, expected_cookie: Option<u32>) -> Result<Vec<Record>> {
        self.read_packet_with_header(expected_cookie)
            .map(|(_, records)| records)
    }

    /// Like [`read_packet`](Self::read_packet), also returning the header.
    pub fn read_packet_with_header(
        &mut self,
        expected_cookie: Option<u32>,
    ) -> Result<(Header, Vec<Record>)> {
        let header = decode_header(&mut self.inner)?;

        if let Some(expected) = expected_cookie.filter(|cookie| *cookie != 0) {
            if expected != header.cookie {
                warn!(
                    expected = format_args!("{expected:#010x}"),
                    found = format_args!("{:#010x}", header.cookie),
                    payload_length = header.payload_length,
                    "discarding packet with unexpected cookie"
                );
                self.discard(header.payload_length)?;
                return Err(BinRpcError::CookieMismatch {
                    expected,
                    found: header.cookie,
                });
            }
        }

        if header.payload_length > self.config.max_payload_size {
            return Err(BinRpcError::PayloadTooLarge {
                size: header.payload_length,
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        self.buf.resize(header.payload_length, 0);
        read_exact(&mut self.inner, &mut self.buf)?;

        let records = decode_payload(&self.buf, self.config.max_depth)?;
        debug!(
            kind = ?header.kind,
            cookie = format_args!("{:#010x}", header.cookie),
            payload_length = header.payload_length,
            records = records.len(),
            "read packet"
        );
        Ok((header, records))
    }

    /// Read a reply, turning a fault packet into [`BinRpcError::Fault`].
    ///
    /// A fault carries an integer code followed by a message.
    pub fn read_response(&mut self, expected_cookie: Option<u32>) -> Result<Vec<Record>> {
        let (header, records) = self.read_packet_with_header(expected_cookie)?;
        if header.kind == PacketKind::Fault {
            return Err(fault_from_records(&records));
        }
        Ok(records)
    }

    fn discard(&mut self, len: usize) -> Result<()> {
        let drained = std::io::copy(&mut (&mut self.inner).take(len as u64), &mut std::io::sink())?;
        if drained != len as u64 {
            return Err(BinRpcError::ConnectionClosed);
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent packets.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current packet reader configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl PacketReader<CtlStream> {
    /// Create a packet reader for `CtlStream` and apply read timeout from config.
    pub fn with_config_ctl(inner: CtlStream, config: CodecConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_codec_error)?;
        Ok(Self::with_config(inner, config))
    }
}

fn fault_from_records(records: &[Record]) -> BinRpcError {
    let code = records
        .first()
        .and_then(|record| record.to_int().ok())
        .unwrap_or_default();
    let message = records
        .get(1)
        .and_then(|record| record.to_text().ok())
        .unwrap_or_default();
    BinRpcError::Fault { code, message }
}

/// Read one packet from `source` and decode its records.
///
/// See [`PacketReader::read_packet`].
pub fn read_packet<R: Read>(source: &mut R, expected_cookie: Option<u32>) -> Result<Vec<Record>> {
    PacketReader::new(source).read_packet(expected_cookie)
}
