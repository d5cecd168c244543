use std::io::{ErrorKind, Write};

use binrpc_transport::CtlStream;
use bytes::BytesMut;
use tracing::debug;

use crate::codec::{encode_packet, CodecConfig};
use crate::cookie::{CookieSource, RandomCookies};
use crate::error::{BinRpcError, Result};
use crate::header::PacketKind;
use crate::record::Value;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete BINRPC packets to any `Write` stream.
///
/// Each packet is encoded into one buffer, written and flushed once, so a
/// failed encode never leaves a partial header on the stream.
pub struct PacketWriter<T, C = RandomCookies> {
    inner: T,
    buf: BytesMut,
    config: CodecConfig,
    cookies: C,
}

impl<T: Write> PacketWriter<T> {
    /// Create a new packet writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new packet writer with explicit configuration.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self::with_cookies(inner, config, RandomCookies::new())
    }
}

impl<T: Write, C: CookieSource> PacketWriter<T, C> {
    /// Create a packet writer drawing request cookies from `cookies`.
    pub fn with_cookies(inner: T, config: CodecConfig, cookies: C) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            cookies,
        }
    }

    /// Send a request carrying `values`, typically a method name followed
    /// by its arguments.
    ///
    /// Returns the cookie to pass to the reader for correlation.
    pub fn write_packet(&mut self, values: &[Value]) -> Result<u32> {
        if values.is_empty() {
            return Err(BinRpcError::Encoding("no values to send".to_string()));
        }
        let cookie = self.cookies.next_cookie();
        self.send(PacketKind::Request, cookie, values)?;
        Ok(cookie)
    }

    /// Send a successful reply echoing the request's cookie.
    pub fn write_reply(&mut self, cookie: u32, values: &[Value]) -> Result<()> {
        self.send(PacketKind::Reply, cookie, values)
    }

    /// Send a fault reply echoing the request's cookie.
    pub fn write_fault(&mut self, cookie: u32, code: i32, message: &str) -> Result<()> {
        self.send(
            PacketKind::Fault,
            cookie,
            &[Value::Int(code), Value::from(message)],
        )
    }

    fn send(&mut self, kind: PacketKind, cookie: u32, values: &[Value]) -> Result<()> {
        self.buf.clear();
        let header = encode_packet(kind, cookie, values, self.config.max_depth, &mut self.buf)?;
        if header.payload_length > self.config.max_payload_size {
            self.buf.clear();
            return Err(BinRpcError::PayloadTooLarge {
                size: header.payload_length,
                max: self.config.max_payload_size,
            });
        }

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(BinRpcError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                // A blocking stream reports an expired write timeout as WouldBlock.
                Err(err) => return Err(BinRpcError::Io(err)),
            }
        }

        self.flush()?;
        debug!(
            ?kind,
            cookie = format_args!("{cookie:#010x}"),
            payload_length = header.payload_length,
            records = values.len(),
            "wrote packet"
        );
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(BinRpcError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current packet writer configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

impl PacketWriter<CtlStream> {
    /// Create a packet writer for `CtlStream` and apply write timeout from config.
    pub fn with_config_ctl(inner: CtlStream, config: CodecConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_codec_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_codec_error(err: binrpc_transport::TransportError) -> BinRpcError {
    match err {
        binrpc_transport::TransportError::Io(io)
        | binrpc_transport::TransportError::Connect { source: io, .. } => BinRpcError::Io(io),
        other => BinRpcError::Io(std::io::Error::other(other.to_string())),
    }
}

/// Encode `values` as a request and write it to `sink` with a random cookie.
///
/// Returns the generated cookie.
pub fn write_packet<W: Write>(sink: &mut W, values: &[Value]) -> Result<u32> {
    PacketWriter::new(sink).write_packet(values)
}

/// Like [`write_packet`], drawing the cookie from `cookies`.
pub fn write_packet_with<W: Write, C: CookieSource>(
    sink: &mut W,
    values: &[Value],
    cookies: C,
) -> Result<u32> {
    PacketWriter::with_cookies(sink, CodecConfig::default(), cookies).write_packet(values)
}
