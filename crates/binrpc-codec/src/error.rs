use crate::record::RecordType;

/// Errors that can occur during BINRPC encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum BinRpcError {
    /// An I/O error occurred while reading or writing packets.
    #[error("binrpc I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete header or record was read.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,

    /// The peer sent bytes that do not follow the wire grammar.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The payload length needs more than the 4 bytes the header can carry.
    #[error("packet length too big ({width} bytes, max 4)")]
    LengthTooBig { width: usize },

    /// The declared payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The response cookie does not match the request cookie.
    #[error("cookie mismatch (expected {expected:#010x}, got {found:#010x})")]
    CookieMismatch { expected: u32, found: u32 },

    /// A record carries a wire type this codec does not decode.
    #[error("record type {0} not implemented")]
    TypeNotImplemented(u8),

    /// A typed accessor or coercion was requested on the wrong kind.
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: RecordType,
    },

    /// Text could not be parsed as the requested number.
    #[error("not a number: {0:?}")]
    NotANumber(String),

    /// Structs are nested deeper than the configured limit.
    #[error("struct nesting exceeds maximum depth of {max}")]
    DepthExceeded { max: usize },

    /// A host value has no valid wire representation.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The peer answered with a fault reply.
    #[error("fault {code}: {message}")]
    Fault { code: i32, message: String },
}

/// Violations of the wire grammar.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid packet magic (expected 0xA, got {0:#X})")]
    BadMagic(u8),

    #[error("unsupported protocol version (expected 1, got {0})")]
    BadVersion(u8),

    /// A record runs past the payload length declared in the header.
    #[error("record at offset {offset} overruns declared payload of {declared} bytes")]
    RecordOverrun { offset: usize, declared: usize },

    #[error("struct member name has type {0}, expected attribute name")]
    UnexpectedStructKey(RecordType),

    #[error("end-of-struct marker outside a struct member name position")]
    UnexpectedEndOfStruct,

    #[error("integer payload of {0} bytes exceeds 4 bytes")]
    IntegerTooWide(usize),

    #[error("string payload is not NUL terminated")]
    MissingNul,

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
}

pub type Result<T> = std::result::Result<T, BinRpcError>;
